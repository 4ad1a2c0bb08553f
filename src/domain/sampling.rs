//! Sample buffer domain types
//!
//! NVML keeps a ring buffer of recent readings per sampling type; these
//! types describe what comes back from it.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Which sample buffer to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingType {
    /// Board power draw (mW)
    TotalPower,
    /// GPU utilization (%)
    GpuUtilization,
    /// Memory utilization (%)
    MemoryUtilization,
    /// Encoder utilization (%)
    EncoderUtilization,
    /// Decoder utilization (%)
    DecoderUtilization,
    /// Processor clock (MHz)
    ProcessorClock,
    /// Memory clock (MHz)
    MemoryClock,
}

impl SamplingType {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::TotalPower => 0,
            Self::GpuUtilization => 1,
            Self::MemoryUtilization => 2,
            Self::EncoderUtilization => 3,
            Self::DecoderUtilization => 4,
            Self::ProcessorClock => 5,
            Self::MemoryClock => 6,
        }
    }
}

/// A sample value, typed by what NVML said the buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Double(f64),
    UnsignedInt(u32),
    UnsignedLong(u64),
    UnsignedLongLong(u64),
}

impl SampleValue {
    /// The value as a `u32`, the view NVML utilization averages use
    ///
    /// Wider values are truncated and doubles rounded toward zero.
    pub fn as_u32(&self) -> u32 {
        match *self {
            Self::Double(v) => v as u32,
            Self::UnsignedInt(v) => v,
            Self::UnsignedLong(v) | Self::UnsignedLongLong(v) => v as u32,
        }
    }
}

/// One timestamped sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// CPU timestamp in microseconds
    pub timestamp_us: u64,
    pub value: SampleValue,
}

/// Mean of the samples' `u32` values, or `None` if there are none
pub fn average_u32(samples: &[Sample]) -> Option<u32> {
    if samples.is_empty() {
        return None;
    }
    let sum: u64 = samples.iter().map(|s| s.value.as_u32() as u64).sum();
    Some((sum / samples.len() as u64) as u32)
}

/// Microsecond timestamp `window` ago, as NVML's `lastSeenTimeStamp` expects
///
/// A window reaching before the epoch maps to 0, which asks for every
/// buffered sample.
pub fn timestamp_since(window: Duration) -> u64 {
    SystemTime::now()
        .checked_sub(window)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: SampleValue) -> Sample {
        Sample {
            timestamp_us: 0,
            value,
        }
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert_eq!(average_u32(&[]), None);
    }

    #[test]
    fn test_average_truncates() {
        let samples = [
            sample(SampleValue::UnsignedInt(10)),
            sample(SampleValue::UnsignedInt(21)),
        ];
        assert_eq!(average_u32(&samples), Some(15));
    }

    #[test]
    fn test_average_does_not_overflow() {
        let samples = [
            sample(SampleValue::UnsignedInt(u32::MAX)),
            sample(SampleValue::UnsignedInt(u32::MAX)),
        ];
        assert_eq!(average_u32(&samples), Some(u32::MAX));
    }

    #[test]
    fn test_timestamp_since() {
        let earlier = timestamp_since(Duration::from_secs(10));
        let now = timestamp_since(Duration::ZERO);
        assert!(now >= earlier + 10_000_000);
        assert_eq!(timestamp_since(Duration::MAX), 0);
    }
}
