//! NVML return codes

use serde::Serialize;
use std::fmt;

/// Status returned by every NVML entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReturnCode {
    Success,
    Uninitialized,
    InvalidArgument,
    NotSupported,
    NoPermission,
    AlreadyInitialized,
    NotFound,
    InsufficientSize,
    InsufficientPower,
    DriverNotLoaded,
    Timeout,
    IrqIssue,
    LibraryNotFound,
    FunctionNotFound,
    CorruptedInforom,
    GpuIsLost,
    ResetRequired,
    OperatingSystem,
    LibRmVersionMismatch,
    InUse,
    Memory,
    NoData,
    VgpuEccNotSupported,
    InsufficientResources,
    Unknown,
    /// A code this crate does not know
    Other(u32),
}

impl ReturnCode {
    /// Create from the raw value an entry point returned
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::Uninitialized,
            2 => Self::InvalidArgument,
            3 => Self::NotSupported,
            4 => Self::NoPermission,
            5 => Self::AlreadyInitialized,
            6 => Self::NotFound,
            7 => Self::InsufficientSize,
            8 => Self::InsufficientPower,
            9 => Self::DriverNotLoaded,
            10 => Self::Timeout,
            11 => Self::IrqIssue,
            12 => Self::LibraryNotFound,
            13 => Self::FunctionNotFound,
            14 => Self::CorruptedInforom,
            15 => Self::GpuIsLost,
            16 => Self::ResetRequired,
            17 => Self::OperatingSystem,
            18 => Self::LibRmVersionMismatch,
            19 => Self::InUse,
            20 => Self::Memory,
            21 => Self::NoData,
            22 => Self::VgpuEccNotSupported,
            23 => Self::InsufficientResources,
            999 => Self::Unknown,
            other => Self::Other(other),
        }
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Success => 0,
            Self::Uninitialized => 1,
            Self::InvalidArgument => 2,
            Self::NotSupported => 3,
            Self::NoPermission => 4,
            Self::AlreadyInitialized => 5,
            Self::NotFound => 6,
            Self::InsufficientSize => 7,
            Self::InsufficientPower => 8,
            Self::DriverNotLoaded => 9,
            Self::Timeout => 10,
            Self::IrqIssue => 11,
            Self::LibraryNotFound => 12,
            Self::FunctionNotFound => 13,
            Self::CorruptedInforom => 14,
            Self::GpuIsLost => 15,
            Self::ResetRequired => 16,
            Self::OperatingSystem => 17,
            Self::LibRmVersionMismatch => 18,
            Self::InUse => 19,
            Self::Memory => 20,
            Self::NoData => 21,
            Self::VgpuEccNotSupported => 22,
            Self::InsufficientResources => 23,
            Self::Unknown => 999,
            Self::Other(raw) => *raw,
        }
    }

    /// Vendor constant name, used when the library cannot describe a code
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success => "NVML_SUCCESS",
            Self::Uninitialized => "NVML_ERROR_UNINITIALIZED",
            Self::InvalidArgument => "NVML_ERROR_INVALID_ARGUMENT",
            Self::NotSupported => "NVML_ERROR_NOT_SUPPORTED",
            Self::NoPermission => "NVML_ERROR_NO_PERMISSION",
            Self::AlreadyInitialized => "NVML_ERROR_ALREADY_INITIALIZED",
            Self::NotFound => "NVML_ERROR_NOT_FOUND",
            Self::InsufficientSize => "NVML_ERROR_INSUFFICIENT_SIZE",
            Self::InsufficientPower => "NVML_ERROR_INSUFFICIENT_POWER",
            Self::DriverNotLoaded => "NVML_ERROR_DRIVER_NOT_LOADED",
            Self::Timeout => "NVML_ERROR_TIMEOUT",
            Self::IrqIssue => "NVML_ERROR_IRQ_ISSUE",
            Self::LibraryNotFound => "NVML_ERROR_LIBRARY_NOT_FOUND",
            Self::FunctionNotFound => "NVML_ERROR_FUNCTION_NOT_FOUND",
            Self::CorruptedInforom => "NVML_ERROR_CORRUPTED_INFOROM",
            Self::GpuIsLost => "NVML_ERROR_GPU_IS_LOST",
            Self::ResetRequired => "NVML_ERROR_RESET_REQUIRED",
            Self::OperatingSystem => "NVML_ERROR_OPERATING_SYSTEM",
            Self::LibRmVersionMismatch => "NVML_ERROR_LIB_RM_VERSION_MISMATCH",
            Self::InUse => "NVML_ERROR_IN_USE",
            Self::Memory => "NVML_ERROR_MEMORY",
            Self::NoData => "NVML_ERROR_NO_DATA",
            Self::VgpuEccNotSupported => "NVML_ERROR_VGPU_ECC_NOT_SUPPORTED",
            Self::InsufficientResources => "NVML_ERROR_INSUFFICIENT_RESOURCES",
            Self::Unknown | Self::Other(_) => "NVML_ERROR_UNKNOWN",
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "{} ({})", self.name(), raw),
            _ => f.write_str(self.name()),
        }
    }
}
