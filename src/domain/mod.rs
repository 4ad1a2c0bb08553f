//! Domain models for nvml-dl
//!
//! Rust types for the enums and records NVML passes across its C API.
//! Values are carried as reported; nothing here judges them.

pub mod device;
pub mod event;
pub mod memory;
pub mod performance;
pub mod process;
pub mod sampling;

pub use device::{
    cpu_set_to_cores, BrandType, BridgeChipInfo, BridgeChipType, ComputeMode, GpuOperationMode,
    HwbcEntry, InforomObject, OperationModes, PciInfo, PcieUtilCounter, RestrictedApi,
    TemperatureThreshold, TopologyLevel,
};
pub use event::{EventData, EventTypes};
pub use memory::{
    EccCounterType, EccErrorCounts, EccMode, MemoryErrorType, MemoryLocation, PageRetirementCause,
};
pub use performance::{
    Bar1MemoryInfo, ClockType, CodecUtilization, MemoryInfo, PerfPolicy, PerformanceState,
    ThrottleReasons, Utilization, ViolationTime,
};
pub use process::{ProcessInfo, ProcessType, ProcessUtilizationSample};
pub use sampling::{Sample, SampleValue, SamplingType};
