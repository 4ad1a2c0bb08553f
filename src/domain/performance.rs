//! Performance and utilization domain types
//!
//! Types for GPU clocks, utilization rates, throttling and VRAM usage.

use serde::{Deserialize, Serialize};

/// Clock domain for clock queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockType {
    /// Graphics clock
    Graphics,
    /// Streaming Multiprocessor clock
    SM,
    /// Memory clock
    Memory,
    /// Video encoder/decoder clock
    Video,
}

impl ClockType {
    /// All clock domains
    pub const ALL: [ClockType; 4] = [Self::Graphics, Self::SM, Self::Memory, Self::Video];

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Graphics => 0,
            Self::SM => 1,
            Self::Memory => 2,
            Self::Video => 3,
        }
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Graphics => "graphics",
            Self::SM => "sm",
            Self::Memory => "memory",
            Self::Video => "video",
        }
    }
}

/// GPU and memory utilization rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Utilization {
    /// Percent of time a kernel was executing (0-100%)
    pub gpu: u32,
    /// Percent of time device memory was read or written (0-100%)
    pub memory: u32,
}

impl Utilization {
    /// Create a new utilization value
    pub fn new(gpu: u32, memory: u32) -> Self {
        Self { gpu, memory }
    }
}

/// Encoder or decoder utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodecUtilization {
    /// Utilization (0-100%)
    pub utilization: u32,
    /// Sampling period in microseconds
    pub sampling_period_us: u32,
}

/// VRAM/Memory information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Total memory in bytes
    pub total: u64,
    /// Used memory in bytes
    pub used: u64,
    /// Free memory in bytes
    pub free: u64,
}

impl MemoryInfo {
    /// Create a new memory info value
    pub fn new(total: u64, used: u64, free: u64) -> Self {
        Self { total, used, free }
    }

    /// Get total memory in MB
    pub fn total_mb(&self) -> u64 {
        self.total / (1024 * 1024)
    }

    /// Get used memory in MB
    pub fn used_mb(&self) -> u64 {
        self.used / (1024 * 1024)
    }

    /// Get usage percentage (0 - 100)
    pub fn usage_percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.used as f64 / self.total as f64) * 100.0) as u8
        }
    }
}

/// BAR1 aperture memory information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bar1MemoryInfo {
    /// Total BAR1 memory in bytes
    pub total: u64,
    /// Used BAR1 memory in bytes
    pub used: u64,
    /// Free BAR1 memory in bytes
    pub free: u64,
}

/// GPU performance state (P-state)
///
/// Lower numbers = higher performance, higher power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PerformanceState {
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    P10,
    P11,
    P12,
    P13,
    P14,
    P15,
    /// Unknown state
    #[default]
    Unknown,
}

impl PerformanceState {
    const STATES: [PerformanceState; 16] = [
        Self::P0,
        Self::P1,
        Self::P2,
        Self::P3,
        Self::P4,
        Self::P5,
        Self::P6,
        Self::P7,
        Self::P8,
        Self::P9,
        Self::P10,
        Self::P11,
        Self::P12,
        Self::P13,
        Self::P14,
        Self::P15,
    ];

    /// Create from raw NVML value
    pub fn from_raw(value: u32) -> Self {
        Self::STATES
            .get(value as usize)
            .copied()
            .unwrap_or(Self::Unknown)
    }

    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        Self::STATES
            .iter()
            .position(|s| s == self)
            .map(|p| p as u32)
            .unwrap_or(32)
    }
}

impl std::fmt::Display for PerformanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            _ => write!(f, "P{}", self.as_raw()),
        }
    }
}

/// Reasons why the GPU clocks are being throttled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThrottleReasons {
    /// GPU is idle
    pub idle: bool,
    /// Clocks limited by the applications clocks setting
    pub applications_clocks: bool,
    /// Software power cap
    pub sw_power_cap: bool,
    /// Hardware slowdown (temperature/power)
    pub hw_slowdown: bool,
    /// Sync boost
    pub sync_boost: bool,
    /// Software thermal slowdown
    pub sw_thermal: bool,
    /// Hardware thermal slowdown
    pub hw_thermal: bool,
    /// Hardware power brake
    pub hw_power_brake: bool,
    /// Display clock setting
    pub display_clocks: bool,
    /// Reason bit NVML could not attribute
    pub unknown: bool,
}

impl ThrottleReasons {
    const GPU_IDLE: u64 = 0x0000_0000_0000_0001;
    const APPLICATIONS_CLOCKS_SETTING: u64 = 0x0000_0000_0000_0002;
    const SW_POWER_CAP: u64 = 0x0000_0000_0000_0004;
    const HW_SLOWDOWN: u64 = 0x0000_0000_0000_0008;
    const SYNC_BOOST: u64 = 0x0000_0000_0000_0010;
    const SW_THERMAL_SLOWDOWN: u64 = 0x0000_0000_0000_0020;
    const HW_THERMAL_SLOWDOWN: u64 = 0x0000_0000_0000_0040;
    const HW_POWER_BRAKE_SLOWDOWN: u64 = 0x0000_0000_0000_0080;
    const DISPLAY_CLOCK_SETTING: u64 = 0x0000_0000_0000_0100;
    const UNKNOWN: u64 = 0x8000_0000_0000_0000;

    /// Decode an NVML throttle reason bitmask
    pub fn from_bits(bits: u64) -> Self {
        Self {
            idle: bits & Self::GPU_IDLE != 0,
            applications_clocks: bits & Self::APPLICATIONS_CLOCKS_SETTING != 0,
            sw_power_cap: bits & Self::SW_POWER_CAP != 0,
            hw_slowdown: bits & Self::HW_SLOWDOWN != 0,
            sync_boost: bits & Self::SYNC_BOOST != 0,
            sw_thermal: bits & Self::SW_THERMAL_SLOWDOWN != 0,
            hw_thermal: bits & Self::HW_THERMAL_SLOWDOWN != 0,
            hw_power_brake: bits & Self::HW_POWER_BRAKE_SLOWDOWN != 0,
            display_clocks: bits & Self::DISPLAY_CLOCK_SETTING != 0,
            unknown: bits & Self::UNKNOWN != 0,
        }
    }

    /// Check if any throttling is active
    pub fn is_throttling(&self) -> bool {
        self.sw_power_cap
            || self.hw_slowdown
            || self.sw_thermal
            || self.hw_thermal
            || self.hw_power_brake
    }

    /// Get a list of active throttle reasons
    pub fn active_reasons(&self) -> Vec<&'static str> {
        [
            (self.idle, "Idle"),
            (self.applications_clocks, "Applications Clocks"),
            (self.sw_power_cap, "Power Cap"),
            (self.hw_slowdown, "HW Slowdown"),
            (self.sw_thermal, "SW Thermal"),
            (self.hw_thermal, "HW Thermal"),
            (self.hw_power_brake, "Power Brake"),
            (self.sync_boost, "Sync Boost"),
            (self.display_clocks, "Display Clocks"),
            (self.unknown, "Unknown"),
        ]
        .into_iter()
        .filter_map(|(active, name)| active.then_some(name))
        .collect()
    }
}

/// Policy a violation counter is reported against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerfPolicy {
    /// Power capping
    Power,
    /// Thermal capping
    Thermal,
    /// Sync boost
    SyncBoost,
    /// Board limit
    BoardLimit,
    /// Low utilization
    LowUtilization,
    /// Board reliability
    Reliability,
}

impl PerfPolicy {
    /// Get the raw value
    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Power => 0,
            Self::Thermal => 1,
            Self::SyncBoost => 2,
            Self::BoardLimit => 3,
            Self::LowUtilization => 4,
            Self::Reliability => 5,
        }
    }
}

/// Time spent violating a performance policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViolationTime {
    /// Reference timestamp in nanoseconds
    pub reference_time_ns: u64,
    /// Violation time in nanoseconds
    pub violation_time_ns: u64,
}
