//! Sample buffer queries

use std::os::raw::{c_uint, c_ulonglong};
use std::time::Duration;

use crate::dl::SymbolSource;
use crate::domain::sampling::{average_u32, timestamp_since};
use crate::domain::{ProcessUtilizationSample, Sample, SampleValue, SamplingType};
use crate::error::NvmlError;
use crate::nvml::device::Device;
use crate::nvml::return_code::ReturnCode;
use crate::nvml::sys::{self, nvmlDevice_t, nvmlProcessUtilizationSample_t, nvmlSample_t};

impl<S: SymbolSource> Device<'_, S> {
    /// Buffered samples of `sampling` newer than `since` ago
    pub fn samples(&self, sampling: SamplingType, since: Duration) -> Result<Vec<Sample>, NvmlError> {
        type GetSamplesFn = unsafe extern "C" fn(
            nvmlDevice_t,
            c_uint,
            c_ulonglong,
            *mut c_uint,
            *mut c_uint,
            *mut nvmlSample_t,
        ) -> c_uint;

        let last_seen = timestamp_since(since);
        let mut value_type: c_uint = sys::VALUE_TYPE_UNSIGNED_INT;
        // SAFETY: signature matches nvml.h; NULL samples queries the count.
        let raw = unsafe {
            self.nvml().call_list(
                "nvmlDeviceGetSamples",
                nvmlSample_t::default(),
                |f: GetSamplesFn, count, samples| {
                    f(
                        self.handle(),
                        sampling.as_raw(),
                        last_seen,
                        &mut value_type,
                        count,
                        samples,
                    )
                },
            )?
        };

        Ok(raw
            .iter()
            .map(|sample| Sample {
                timestamp_us: sample.time_stamp,
                value: decode_value(value_type, sample),
            })
            .collect())
    }

    /// Mean of the buffered `sampling` values newer than `since` ago
    ///
    /// Fails with [`NvmlError::NoData`] when the buffer holds nothing in
    /// that window.
    pub fn average_usage(&self, sampling: SamplingType, since: Duration) -> Result<u32, NvmlError> {
        const FUNCTION: &str = "nvmlDeviceGetSamples";

        let samples = match self.samples(sampling, since) {
            Err(NvmlError::NotFound { .. }) => Vec::new(),
            other => other?,
        };
        average_u32(&samples).ok_or(NvmlError::NoData { function: FUNCTION })
    }

    /// Per-process utilization newer than `since` ago
    ///
    /// An empty list means no process used the GPU in that window.
    pub fn process_utilization(
        &self,
        since: Duration,
    ) -> Result<Vec<ProcessUtilizationSample>, NvmlError> {
        type ProcessUtilizationFn = unsafe extern "C" fn(
            nvmlDevice_t,
            *mut nvmlProcessUtilizationSample_t,
            *mut c_uint,
            c_ulonglong,
        ) -> c_uint;

        let last_seen = timestamp_since(since);
        // SAFETY: signature matches nvml.h; NULL utilization queries the count.
        let result = unsafe {
            self.nvml().call_list(
                "nvmlDeviceGetProcessUtilization",
                nvmlProcessUtilizationSample_t::default(),
                |f: ProcessUtilizationFn, count, samples| f(self.handle(), samples, count, last_seen),
            )
        };

        let raw = match result {
            Err(e) if e.return_code() == Some(ReturnCode::NotFound) => return Ok(Vec::new()),
            other => other?,
        };

        Ok(raw
            .iter()
            .map(|s| ProcessUtilizationSample {
                pid: s.pid,
                timestamp_us: s.time_stamp,
                sm_util: s.sm_util,
                mem_util: s.mem_util,
                enc_util: s.enc_util,
                dec_util: s.dec_util,
            })
            .collect())
    }
}

fn decode_value(value_type: c_uint, sample: &nvmlSample_t) -> SampleValue {
    // SAFETY: NVML wrote the member named by `value_type`; every member is
    // plain data, so reading any of them is defined.
    unsafe {
        match value_type {
            sys::VALUE_TYPE_DOUBLE => SampleValue::Double(sample.sample_value.d_val),
            sys::VALUE_TYPE_UNSIGNED_LONG => {
                SampleValue::UnsignedLong(sample.sample_value.ul_val as u64)
            }
            sys::VALUE_TYPE_UNSIGNED_LONG_LONG => {
                SampleValue::UnsignedLongLong(sample.sample_value.ull_val)
            }
            _ => SampleValue::UnsignedInt(sample.sample_value.ui_val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeDevice, FakeLibrary};
    use crate::nvml::Nvml;

    #[test]
    fn test_samples_and_average() {
        let library = FakeLibrary::new()
            .with_device(FakeDevice::new("A", "GPU-a").with_samples(&[10, 20, 60]));
        let nvml = Nvml::from_source(&library).unwrap();
        let device = nvml.device_by_index(0).unwrap();

        let samples = device
            .samples(SamplingType::GpuUtilization, Duration::from_secs(1))
            .unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].value, SampleValue::UnsignedInt(60));

        let average = device
            .average_usage(SamplingType::GpuUtilization, Duration::from_secs(1))
            .unwrap();
        assert_eq!(average, 30);
    }

    #[test]
    fn test_average_without_samples_is_no_data() {
        let library = FakeLibrary::new().with_device(FakeDevice::new("A", "GPU-a"));
        let nvml = Nvml::from_source(&library).unwrap();
        let err = nvml
            .device_by_index(0)
            .unwrap()
            .average_usage(SamplingType::GpuUtilization, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, NvmlError::NoData { .. }));
    }

    #[test]
    fn test_process_utilization_not_found_is_empty() {
        let library = FakeLibrary::new().with_device(FakeDevice::new("A", "GPU-a"));
        let nvml = Nvml::from_source(&library).unwrap();
        let samples = nvml
            .device_by_index(0)
            .unwrap()
            .process_utilization(Duration::from_secs(1))
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_process_utilization() {
        let library = FakeLibrary::new()
            .with_device(FakeDevice::new("A", "GPU-a").with_process(4242, 1024));
        let nvml = Nvml::from_source(&library).unwrap();
        let samples = nvml
            .device_by_index(0)
            .unwrap()
            .process_utilization(Duration::from_secs(1))
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pid, 4242);
    }

    #[test]
    fn test_decode_value_by_type() {
        let sample = nvmlSample_t {
            time_stamp: 1,
            sample_value: sys::nvmlValue_t { d_val: 1.5 },
        };
        assert_eq!(
            decode_value(sys::VALUE_TYPE_DOUBLE, &sample),
            SampleValue::Double(1.5)
        );

        let sample = nvmlSample_t {
            time_stamp: 1,
            sample_value: sys::nvmlValue_t { ull_val: 7 },
        };
        assert_eq!(
            decode_value(sys::VALUE_TYPE_UNSIGNED_LONG_LONG, &sample),
            SampleValue::UnsignedLongLong(7)
        );
    }
}
