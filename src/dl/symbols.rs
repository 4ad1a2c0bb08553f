//! NVML entry point table
//!
//! One record per vendor entry point. Callers resolve by base name; the
//! table supplies newer versioned exports to try first. Function signatures
//! are not recorded here: each call site names the pointer type it expects.

use serde::Serialize;
use std::fmt;

/// Functional area an entry point belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Library initialization, shutdown and error strings
    Initialization,
    /// System-wide queries
    System,
    /// Per-device read-only queries
    DeviceQuery,
    /// Unit (S-class) queries
    Unit,
    /// Per-device state changes
    DeviceCommand,
    /// Event sets and registration
    Event,
}

impl Group {
    /// All groups in display order
    pub const ALL: [Group; 6] = [
        Group::Initialization,
        Group::System,
        Group::DeviceQuery,
        Group::Unit,
        Group::DeviceCommand,
        Group::Event,
    ];
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Group::Initialization => "initialization",
            Group::System => "system",
            Group::DeviceQuery => "device-query",
            Group::Unit => "unit",
            Group::DeviceCommand => "device-command",
            Group::Event => "event",
        };
        f.write_str(name)
    }
}

/// A vendor entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    /// Base export name
    pub name: &'static str,
    /// Versioned exports preferred over the base name, newest first
    pub aliases: &'static [&'static str],
    /// Functional area
    pub group: Group,
}

impl EntryPoint {
    const fn new(name: &'static str, group: Group) -> Self {
        Self {
            name,
            aliases: &[],
            group,
        }
    }

    const fn versioned(name: &'static str, aliases: &'static [&'static str], group: Group) -> Self {
        Self {
            name,
            aliases,
            group,
        }
    }

    /// Export names to try, in order
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> {
        self.aliases.iter().copied().chain(std::iter::once(self.name))
    }
}

use Group::*;

/// Every entry point the crate knows about
pub static ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint::new("nvmlErrorString", Initialization),
    EntryPoint::versioned("nvmlInit", &["nvmlInit_v2"], Initialization),
    EntryPoint::new("nvmlShutdown", Initialization),
    EntryPoint::new("nvmlSystemGetDriverVersion", System),
    EntryPoint::new("nvmlSystemGetNVMLVersion", System),
    EntryPoint::new("nvmlSystemGetProcessName", System),
    EntryPoint::new("nvmlSystemGetTopologyGpuSet", System),
    EntryPoint::versioned("nvmlDeviceGetCount", &["nvmlDeviceGetCount_v2"], DeviceQuery),
    EntryPoint::versioned(
        "nvmlDeviceGetHandleByIndex",
        &["nvmlDeviceGetHandleByIndex_v2"],
        DeviceQuery,
    ),
    EntryPoint::versioned(
        "nvmlDeviceGetHandleByPciBusId",
        &["nvmlDeviceGetHandleByPciBusId_v2"],
        DeviceQuery,
    ),
    EntryPoint::new("nvmlDeviceGetHandleBySerial", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetHandleByUUID", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetAPIRestriction", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetApplicationsClock", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetAutoBoostedClocksEnabled", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetBAR1MemoryInfo", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetBoardId", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetBrand", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetBridgeChipInfo", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetClockInfo", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetComputeMode", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetComputeRunningProcesses", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetCpuAffinity", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetCurrPcieLinkGeneration", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetCurrPcieLinkWidth", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetCurrentClocksThrottleReasons", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetDecoderUtilization", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetDefaultApplicationsClock", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetDetailedEccErrors", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetDisplayActive", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetDisplayMode", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetEccMode", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetEncoderUtilization", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetEnforcedPowerLimit", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetFanSpeed", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetGpuOperationMode", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetGraphicsRunningProcesses", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetIndex", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetInforomConfigurationChecksum", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetInforomImageVersion", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetInforomVersion", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMaxClockInfo", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMaxPcieLinkGeneration", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMaxPcieLinkWidth", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMemoryErrorCounter", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMemoryInfo", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMinorNumber", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetMultiGpuBoard", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetName", DeviceQuery),
    EntryPoint::versioned("nvmlDeviceGetPciInfo", &["nvmlDeviceGetPciInfo_v3"], DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPcieReplayCounter", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPcieThroughput", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPerformanceState", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPersistenceMode", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPowerManagementDefaultLimit", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPowerManagementLimit", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPowerManagementLimitConstraints", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPowerManagementMode", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPowerState", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetPowerUsage", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetProcessUtilization", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetRetiredPages", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetRetiredPagesPendingStatus", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetSamples", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetSerial", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetSupportedClocksThrottleReasons", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetSupportedGraphicsClocks", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetSupportedMemoryClocks", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetTemperature", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetTemperatureThreshold", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetTopologyCommonAncestor", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetTopologyNearestGpus", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetTotalEccErrors", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetUUID", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetUtilizationRates", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetVbiosVersion", DeviceQuery),
    EntryPoint::new("nvmlDeviceGetViolationStatus", DeviceQuery),
    EntryPoint::new("nvmlDeviceOnSameBoard", DeviceQuery),
    EntryPoint::new("nvmlDeviceValidateInforom", DeviceQuery),
    EntryPoint::new("nvmlSystemGetHicVersion", Unit),
    EntryPoint::new("nvmlDeviceClearCpuAffinity", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetCpuAffinity", DeviceCommand),
    EntryPoint::new("nvmlDeviceClearEccErrorCounts", DeviceCommand),
    EntryPoint::new("nvmlDeviceResetApplicationsClocks", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetAPIRestriction", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetApplicationsClocks", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetAutoBoostedClocksEnabled", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetDefaultAutoBoostedClocksEnabled", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetComputeMode", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetEccMode", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetGpuOperationMode", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetPersistenceMode", DeviceCommand),
    EntryPoint::new("nvmlDeviceSetPowerManagementLimit", DeviceCommand),
    EntryPoint::new("nvmlDeviceGetSupportedEventTypes", Event),
    EntryPoint::new("nvmlDeviceRegisterEvents", Event),
    EntryPoint::new("nvmlEventSetCreate", Event),
    EntryPoint::new("nvmlEventSetFree", Event),
    EntryPoint::new("nvmlEventSetWait", Event),
];

/// Find the entry point with base name `name`
pub fn lookup(name: &str) -> Option<&'static EntryPoint> {
    ENTRY_POINTS.iter().find(|entry| entry.name == name)
}

/// Entry points in `group`
pub fn in_group(group: Group) -> impl Iterator<Item = &'static EntryPoint> {
    ENTRY_POINTS.iter().filter(move |entry| entry.group == group)
}
