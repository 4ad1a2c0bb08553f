//! Device description domain types
//!
//! Identity, modes and topology of a GPU as NVML reports them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Product brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrandType {
    Unknown,
    Quadro,
    Tesla,
    Nvs,
    Grid,
    GeForce,
    Titan,
    /// Any brand value newer than this crate
    Other(u32),
}

impl BrandType {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Quadro,
            2 => Self::Tesla,
            3 => Self::Nvs,
            4 => Self::Grid,
            5 => Self::GeForce,
            6 => Self::Titan,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for BrandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "Brand({})", raw),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Compute mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeMode {
    /// Multiple contexts per device
    Default,
    /// Deprecated single-thread exclusivity
    ExclusiveThread,
    /// No contexts allowed
    Prohibited,
    /// One context per device, usable from multiple threads
    ExclusiveProcess,
    Unknown(u32),
}

impl ComputeMode {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Default,
            1 => Self::ExclusiveThread,
            2 => Self::Prohibited,
            3 => Self::ExclusiveProcess,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Default => 0,
            Self::ExclusiveThread => 1,
            Self::Prohibited => 2,
            Self::ExclusiveProcess => 3,
            Self::Unknown(raw) => *raw,
        }
    }
}

/// GPU Operation Mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuOperationMode {
    /// Everything enabled
    AllOn,
    /// Graphics disabled, compute only
    Compute,
    /// Reduced double precision
    LowDoublePrecision,
    Unknown(u32),
}

impl GpuOperationMode {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::AllOn,
            1 => Self::Compute,
            2 => Self::LowDoublePrecision,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::AllOn => 0,
            Self::Compute => 1,
            Self::LowDoublePrecision => 2,
            Self::Unknown(raw) => *raw,
        }
    }
}

/// Current and pending GPU operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationModes {
    pub current: GpuOperationMode,
    pub pending: GpuOperationMode,
}

/// InfoROM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InforomObject {
    Oem,
    Ecc,
    Power,
}

impl InforomObject {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Oem => 0,
            Self::Ecc => 1,
            Self::Power => 2,
        }
    }
}

/// APIs that can be restricted to root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictedApi {
    SetApplicationClocks,
    SetAutoBoostedClocks,
}

impl RestrictedApi {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::SetApplicationClocks => 0,
            Self::SetAutoBoostedClocks => 1,
        }
    }
}

/// Temperature threshold kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureThreshold {
    /// GPU shuts down
    Shutdown,
    /// GPU starts slowing down
    Slowdown,
    /// Memory maximum operating temperature
    MemoryMax,
    /// GPU maximum operating temperature
    GpuMax,
}

impl TemperatureThreshold {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Shutdown => 0,
            Self::Slowdown => 1,
            Self::MemoryMax => 2,
            Self::GpuMax => 3,
        }
    }
}

/// PCIe throughput direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcieUtilCounter {
    /// Transmitted bytes
    Tx,
    /// Received bytes
    Rx,
}

impl PcieUtilCounter {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Tx => 0,
            Self::Rx => 1,
        }
    }
}

/// Bridge chip kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeChipType {
    Plx,
    Bro4,
    Unknown(u32),
}

impl BridgeChipType {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Plx,
            1 => Self::Bro4,
            other => Self::Unknown(other),
        }
    }
}

/// A bridge chip between the GPU and the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeChipInfo {
    pub chip_type: BridgeChipType,
    pub fw_version: u32,
}

/// PCI attributes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PciInfo {
    /// Domain:bus:device.function identifier
    pub bus_id: String,
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    /// Combined device and vendor ID
    pub pci_device_id: u32,
    /// Combined subsystem and subsystem vendor ID
    pub pci_sub_system_id: u32,
}

/// Closest common ancestor of two GPUs in the PCIe/CPU topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TopologyLevel {
    /// Same board
    Internal,
    /// Single PCIe switch
    Single,
    /// Multiple PCIe switches, no host bridge crossing
    Multiple,
    /// Same host bridge
    HostBridge,
    /// Same NUMA node
    Node,
    /// Across the SMP interconnect
    System,
    Unknown(u32),
}

impl TopologyLevel {
    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Internal,
            10 => Self::Single,
            20 => Self::Multiple,
            30 => Self::HostBridge,
            40 => Self::Node,
            50 => Self::System,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Internal => 0,
            Self::Single => 10,
            Self::Multiple => 20,
            Self::HostBridge => 30,
            Self::Node => 40,
            Self::System => 50,
            Self::Unknown(raw) => *raw,
        }
    }
}

/// Host bridge (S-class) firmware entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwbcEntry {
    pub id: u32,
    pub firmware_version: String,
}

/// Expand a CPU affinity bitmask into CPU indices
///
/// `words` is the array NVML fills, one machine word per element.
pub fn cpu_set_to_cores(words: &[std::os::raw::c_ulong]) -> Vec<u32> {
    let word_bits = std::os::raw::c_ulong::BITS;
    let mut cores = Vec::new();
    for (i, word) in words.iter().enumerate() {
        for bit in 0..word_bits {
            if word & (1 << bit) != 0 {
                cores.push(i as u32 * word_bits + bit);
            }
        }
    }
    cores
}
