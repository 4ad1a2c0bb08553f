//! Memory domain types including ECC error tracking
//!
//! ECC counters are passed through as NVML reports them; no thresholds or
//! health judgements are applied here.

use serde::{Deserialize, Serialize};

/// Kind of memory error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryErrorType {
    /// Single-bit, corrected by ECC
    Corrected,
    /// Double-bit, not correctable
    Uncorrected,
}

impl MemoryErrorType {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Corrected => 0,
            Self::Uncorrected => 1,
        }
    }
}

/// Lifetime of an ECC counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EccCounterType {
    /// Reset on driver reload
    Volatile,
    /// Persistent across reboots
    Aggregate,
}

impl EccCounterType {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Volatile => 0,
            Self::Aggregate => 1,
        }
    }
}

/// Memory location an error counter refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryLocation {
    L1Cache,
    L2Cache,
    DeviceMemory,
    RegisterFile,
    TextureMemory,
    TextureShm,
    Cbu,
    Sram,
}

impl MemoryLocation {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::L1Cache => 0,
            Self::L2Cache => 1,
            Self::DeviceMemory => 2,
            Self::RegisterFile => 3,
            Self::TextureMemory => 4,
            Self::TextureShm => 5,
            Self::Cbu => 6,
            Self::Sram => 7,
        }
    }
}

/// Per-location ECC error counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EccErrorCounts {
    pub l1_cache: u64,
    pub l2_cache: u64,
    pub device_memory: u64,
    pub register_file: u64,
}

impl EccErrorCounts {
    /// Sum over all locations
    pub fn total(&self) -> u64 {
        self.l1_cache
            .saturating_add(self.l2_cache)
            .saturating_add(self.device_memory)
            .saturating_add(self.register_file)
    }
}

/// Current and pending ECC mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EccMode {
    /// ECC enabled now
    pub current: bool,
    /// ECC enabled after the next reboot
    pub pending: bool,
}

impl EccMode {
    /// Check if a mode change is waiting for a reboot
    pub fn has_pending_change(&self) -> bool {
        self.current != self.pending
    }
}

/// Why a memory page was retired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRetirementCause {
    /// Repeated single-bit ECC errors
    MultipleSingleBitEccErrors,
    /// A double-bit ECC error
    DoubleBitEccError,
}

impl PageRetirementCause {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::MultipleSingleBitEccErrors => 0,
            Self::DoubleBitEccError => 1,
        }
    }
}
