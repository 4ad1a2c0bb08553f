//! Process domain types
//!
//! Types for processes running on a GPU and their sampled utilization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which engine a process is using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessType {
    /// CUDA/compute context
    Compute,
    /// Graphics context
    Graphics,
}

/// A process holding a context on the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process ID
    pub pid: u32,
    /// GPU memory used by this process (bytes), if the driver reports it
    pub used_memory: Option<u64>,
    /// Context kind
    pub process_type: ProcessType,
}

impl ProcessInfo {
    /// NVML reports this value when usage is unavailable (e.g. under WDDM)
    const NOT_AVAILABLE: u64 = u64::MAX;

    /// Create from raw NVML values
    pub fn new(pid: u32, used_memory: u64, process_type: ProcessType) -> Self {
        Self {
            pid,
            used_memory: (used_memory != Self::NOT_AVAILABLE).then_some(used_memory),
            process_type,
        }
    }

    /// Get memory usage in MB
    pub fn memory_mb(&self) -> Option<f64> {
        self.used_memory.map(|b| b as f64 / 1024.0 / 1024.0)
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memory_mb() {
            Some(mb) => write!(f, "PID {} ({:?}): {:.0} MB", self.pid, self.process_type, mb),
            None => write!(f, "PID {} ({:?}): N/A", self.pid, self.process_type),
        }
    }
}

/// Per-process utilization sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessUtilizationSample {
    pub pid: u32,
    /// CPU timestamp in microseconds
    pub timestamp_us: u64,
    /// SM (3D/compute) utilization
    pub sm_util: u32,
    /// Frame buffer memory utilization
    pub mem_util: u32,
    /// Encoder utilization
    pub enc_util: u32,
    /// Decoder utilization
    pub dec_util: u32,
}
