//! Device queries and commands
//!
//! [`Device`] pairs an `nvmlDevice_t` handle with the [`Nvml`] session it
//! came from. Each method resolves its entry point through the session at
//! call time.

use std::fmt;
use std::os::raw::{c_char, c_int, c_uint, c_ulong, c_ulonglong};
use std::ptr;

use crate::dl::source::LoadedLibrary;
use crate::dl::SymbolSource;
use crate::domain::{
    cpu_set_to_cores, Bar1MemoryInfo, BrandType, BridgeChipInfo, BridgeChipType, ClockType,
    CodecUtilization, ComputeMode, EccCounterType, EccErrorCounts, EccMode, GpuOperationMode,
    InforomObject, MemoryErrorType, MemoryInfo, MemoryLocation, OperationModes,
    PageRetirementCause, PciInfo, PcieUtilCounter, PerfPolicy, PerformanceState, ProcessInfo,
    ProcessType, RestrictedApi, TemperatureThreshold, ThrottleReasons, TopologyLevel,
    Utilization, ViolationTime,
};
use crate::error::NvmlError;
use crate::nvml::session::Nvml;
use crate::nvml::sys::{
    self, nvmlBAR1Memory_t, nvmlBridgeChipHierarchy_t, nvmlDevice_t, nvmlEccErrorCounts_t,
    nvmlMemory_t, nvmlPciInfo_t, nvmlProcessInfo_t, nvmlUtilization_t, nvmlViolationTime_t,
    DeviceActionFn, DeviceKeyedU32Fn, DeviceListFn, DevicePairFn, DeviceSetFn, DeviceStringFn,
    DeviceU32Fn, DeviceU64Fn,
};

/// `nvmlEnableState_t`
const DISABLED: c_uint = 0;
const ENABLED: c_uint = 1;

fn enable_state(enabled: bool) -> c_uint {
    if enabled {
        ENABLED
    } else {
        DISABLED
    }
}

/// A GPU handle borrowed from an [`Nvml`] session
pub struct Device<'nvml, S: SymbolSource = LoadedLibrary> {
    nvml: &'nvml Nvml<S>,
    handle: nvmlDevice_t,
}

impl<S: SymbolSource> Clone for Device<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: SymbolSource> Copy for Device<'_, S> {}

impl<S: SymbolSource> fmt::Debug for Device<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Device").field(&self.handle).finish()
    }
}

impl<S: SymbolSource> PartialEq for Device<'_, S> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<'nvml, S: SymbolSource> Device<'nvml, S> {
    pub(crate) fn new(nvml: &'nvml Nvml<S>, handle: nvmlDevice_t) -> Self {
        Self { nvml, handle }
    }

    /// The raw NVML handle
    pub fn handle(&self) -> nvmlDevice_t {
        self.handle
    }

    /// The session this device belongs to
    pub fn nvml(&self) -> &'nvml Nvml<S> {
        self.nvml
    }

    // Shape helpers. Each resolves `function` expecting the named shape.

    fn get_u32(&self, function: &'static str) -> Result<u32, NvmlError> {
        let mut value: c_uint = 0;
        // SAFETY: callers only pass entry points of shape (device, unsigned int *)
        unsafe {
            self.nvml
                .call(function, |f: DeviceU32Fn| f(self.handle, &mut value))?
        };
        Ok(value)
    }

    fn get_u64(&self, function: &'static str) -> Result<u64, NvmlError> {
        let mut value: c_ulonglong = 0;
        // SAFETY: callers only pass entry points of shape (device, unsigned long long *)
        unsafe {
            self.nvml
                .call(function, |f: DeviceU64Fn| f(self.handle, &mut value))?
        };
        Ok(value)
    }

    fn get_bool(&self, function: &'static str) -> Result<bool, NvmlError> {
        self.get_u32(function).map(|state| state != DISABLED)
    }

    fn get_pair(&self, function: &'static str) -> Result<(u32, u32), NvmlError> {
        let mut first: c_uint = 0;
        let mut second: c_uint = 0;
        // SAFETY: callers only pass entry points of shape (device, unsigned int *, unsigned int *)
        unsafe {
            self.nvml.call(function, |f: DevicePairFn| {
                f(self.handle, &mut first, &mut second)
            })?
        };
        Ok((first, second))
    }

    fn get_keyed_u32(&self, function: &'static str, key: c_uint) -> Result<u32, NvmlError> {
        let mut value: c_uint = 0;
        // SAFETY: callers only pass entry points of shape (device, enum, unsigned int *)
        unsafe {
            self.nvml
                .call(function, |f: DeviceKeyedU32Fn| f(self.handle, key, &mut value))?
        };
        Ok(value)
    }

    fn get_string(&self, function: &'static str, len: usize) -> Result<String, NvmlError> {
        // SAFETY: callers only pass entry points of shape (device, char *, unsigned int)
        unsafe {
            self.nvml
                .call_string(function, len, |f: DeviceStringFn, buffer, len| {
                    f(self.handle, buffer, len)
                })
        }
    }

    fn run(&self, function: &'static str) -> Result<(), NvmlError> {
        // SAFETY: callers only pass entry points of shape (device)
        unsafe { self.nvml.call(function, |f: DeviceActionFn| f(self.handle)) }
    }

    fn set(&self, function: &'static str, value: c_uint) -> Result<(), NvmlError> {
        // SAFETY: callers only pass entry points of shape (device, unsigned int/enum)
        unsafe {
            self.nvml
                .call(function, |f: DeviceSetFn| f(self.handle, value))
        }
    }

    fn processes(
        &self,
        function: &'static str,
        process_type: ProcessType,
    ) -> Result<Vec<ProcessInfo>, NvmlError> {
        // SAFETY: (device, unsigned int *count, nvmlProcessInfo_t *infos), v1 records
        let infos = unsafe {
            self.nvml.call_list(
                function,
                nvmlProcessInfo_t::default(),
                |f: DeviceListFn<nvmlProcessInfo_t>, count, infos| f(self.handle, count, infos),
            )?
        };

        Ok(infos
            .iter()
            .map(|p| ProcessInfo::new(p.pid, p.used_gpu_memory, process_type))
            .collect())
    }

    // Identity

    /// Product name
    pub fn name(&self) -> Result<String, NvmlError> {
        self.get_string("nvmlDeviceGetName", sys::DEVICE_NAME_BUFFER_SIZE)
    }

    /// Globally unique immutable identifier
    pub fn uuid(&self) -> Result<String, NvmlError> {
        self.get_string("nvmlDeviceGetUUID", sys::DEVICE_UUID_BUFFER_SIZE)
    }

    /// Board serial number
    pub fn serial(&self) -> Result<String, NvmlError> {
        self.get_string("nvmlDeviceGetSerial", sys::DEVICE_SERIAL_BUFFER_SIZE)
    }

    /// NVML index
    pub fn index(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetIndex")
    }

    /// Minor number of the `/dev/nvidiaN` node
    pub fn minor_number(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetMinorNumber")
    }

    /// Board ID, shared by GPUs on the same board
    pub fn board_id(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetBoardId")
    }

    /// Whether the GPU sits on a multi-GPU board
    pub fn multi_gpu_board(&self) -> Result<bool, NvmlError> {
        self.get_u32("nvmlDeviceGetMultiGpuBoard").map(|v| v != 0)
    }

    pub fn brand(&self) -> Result<BrandType, NvmlError> {
        self.get_u32("nvmlDeviceGetBrand").map(BrandType::from_raw)
    }

    /// PCI attributes
    pub fn pci_info(&self) -> Result<PciInfo, NvmlError> {
        type PciInfoFn = unsafe extern "C" fn(nvmlDevice_t, *mut nvmlPciInfo_t) -> c_uint;
        const FUNCTION: &str = "nvmlDeviceGetPciInfo";

        let mut raw = nvmlPciInfo_t::default();
        // SAFETY: every version takes (device, nvmlPciInfo_t *); the buffer
        // has room for the largest layout.
        let export = unsafe {
            let (entry, export) = self.nvml.resolve_versioned::<PciInfoFn>(FUNCTION)?;
            self.nvml.check(FUNCTION, entry(self.handle, &mut raw))?;
            export
        };

        // Only the _v3 layout carries the extended bus ID
        let bus_id = if export == "nvmlDeviceGetPciInfo_v3" {
            sys::string_from_buffer(&raw.bus_id)
        } else {
            sys::string_from_buffer(&raw.bus_id_legacy)
        };

        Ok(PciInfo {
            bus_id,
            domain: raw.domain,
            bus: raw.bus,
            device: raw.device,
            pci_device_id: raw.pci_device_id,
            pci_sub_system_id: raw.pci_sub_system_id,
        })
    }

    // Memory and utilization

    /// Frame buffer memory usage
    pub fn memory_info(&self) -> Result<MemoryInfo, NvmlError> {
        type MemoryInfoFn = unsafe extern "C" fn(nvmlDevice_t, *mut nvmlMemory_t) -> c_uint;

        let mut raw = nvmlMemory_t::default();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetMemoryInfo", |f: MemoryInfoFn| {
                f(self.handle, &mut raw)
            })?
        };
        Ok(MemoryInfo::new(raw.total, raw.used, raw.free))
    }

    /// BAR1 aperture usage
    pub fn bar1_memory_info(&self) -> Result<Bar1MemoryInfo, NvmlError> {
        type Bar1MemoryFn = unsafe extern "C" fn(nvmlDevice_t, *mut nvmlBAR1Memory_t) -> c_uint;

        let mut raw = nvmlBAR1Memory_t::default();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetBAR1MemoryInfo", |f: Bar1MemoryFn| {
                f(self.handle, &mut raw)
            })?
        };
        Ok(Bar1MemoryInfo {
            total: raw.bar1_total,
            used: raw.bar1_used,
            free: raw.bar1_free,
        })
    }

    /// GPU and memory utilization over the last sample period
    pub fn utilization(&self) -> Result<Utilization, NvmlError> {
        type UtilizationFn = unsafe extern "C" fn(nvmlDevice_t, *mut nvmlUtilization_t) -> c_uint;

        let mut raw = nvmlUtilization_t::default();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetUtilizationRates", |f: UtilizationFn| {
                f(self.handle, &mut raw)
            })?
        };
        Ok(Utilization::new(raw.gpu, raw.memory))
    }

    pub fn encoder_utilization(&self) -> Result<CodecUtilization, NvmlError> {
        let (utilization, sampling_period_us) = self.get_pair("nvmlDeviceGetEncoderUtilization")?;
        Ok(CodecUtilization {
            utilization,
            sampling_period_us,
        })
    }

    pub fn decoder_utilization(&self) -> Result<CodecUtilization, NvmlError> {
        let (utilization, sampling_period_us) = self.get_pair("nvmlDeviceGetDecoderUtilization")?;
        Ok(CodecUtilization {
            utilization,
            sampling_period_us,
        })
    }

    // Thermal and power

    /// GPU die temperature in °C
    pub fn temperature(&self) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetTemperature", sys::TEMPERATURE_GPU)
    }

    /// Temperature threshold in °C
    pub fn temperature_threshold(&self, threshold: TemperatureThreshold) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetTemperatureThreshold", threshold.as_raw())
    }

    /// Intended fan speed in percent
    pub fn fan_speed(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetFanSpeed")
    }

    /// Board power draw in milliwatts
    pub fn power_usage(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetPowerUsage")
    }

    /// Power management limit in milliwatts
    pub fn power_management_limit(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetPowerManagementLimit")
    }

    /// Allowed (min, max) power management limit in milliwatts
    pub fn power_management_limit_constraints(&self) -> Result<(u32, u32), NvmlError> {
        self.get_pair("nvmlDeviceGetPowerManagementLimitConstraints")
    }

    pub fn power_management_default_limit(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetPowerManagementDefaultLimit")
    }

    /// Limit actually enforced, after all constraints
    pub fn enforced_power_limit(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetEnforcedPowerLimit")
    }

    pub fn power_management_mode(&self) -> Result<bool, NvmlError> {
        self.get_bool("nvmlDeviceGetPowerManagementMode")
    }

    pub fn performance_state(&self) -> Result<PerformanceState, NvmlError> {
        self.get_u32("nvmlDeviceGetPerformanceState")
            .map(PerformanceState::from_raw)
    }

    /// Deprecated alias NVML keeps for the performance state
    pub fn power_state(&self) -> Result<PerformanceState, NvmlError> {
        self.get_u32("nvmlDeviceGetPowerState")
            .map(PerformanceState::from_raw)
    }

    // Clocks

    /// Current clock in MHz
    pub fn clock_info(&self, clock: ClockType) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetClockInfo", clock.as_raw())
    }

    /// Maximum clock in MHz
    pub fn max_clock_info(&self, clock: ClockType) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetMaxClockInfo", clock.as_raw())
    }

    /// Applications clock target in MHz
    pub fn applications_clock(&self, clock: ClockType) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetApplicationsClock", clock.as_raw())
    }

    pub fn default_applications_clock(&self, clock: ClockType) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetDefaultApplicationsClock", clock.as_raw())
    }

    /// Memory clocks the applications clock can be set to, in MHz
    pub fn supported_memory_clocks(&self) -> Result<Vec<u32>, NvmlError> {
        // SAFETY: (device, unsigned int *count, unsigned int *clocksMHz)
        unsafe {
            self.nvml.call_list(
                "nvmlDeviceGetSupportedMemoryClocks",
                0,
                |f: DeviceListFn<c_uint>, count, clocks| f(self.handle, count, clocks),
            )
        }
    }

    /// Graphics clocks usable with `memory_clock_mhz`, in MHz
    pub fn supported_graphics_clocks(&self, memory_clock_mhz: u32) -> Result<Vec<u32>, NvmlError> {
        type GraphicsClocksFn =
            unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_uint, *mut c_uint) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call_list(
                "nvmlDeviceGetSupportedGraphicsClocks",
                0,
                |f: GraphicsClocksFn, count, clocks| f(self.handle, memory_clock_mhz, count, clocks),
            )
        }
    }

    /// Auto boost (current, default)
    pub fn auto_boosted_clocks_enabled(&self) -> Result<(bool, bool), NvmlError> {
        self.get_pair("nvmlDeviceGetAutoBoostedClocksEnabled")
            .map(|(current, default)| (current != DISABLED, default != DISABLED))
    }

    pub fn current_throttle_reasons(&self) -> Result<ThrottleReasons, NvmlError> {
        self.get_u64("nvmlDeviceGetCurrentClocksThrottleReasons")
            .map(ThrottleReasons::from_bits)
    }

    pub fn supported_throttle_reasons(&self) -> Result<ThrottleReasons, NvmlError> {
        self.get_u64("nvmlDeviceGetSupportedClocksThrottleReasons")
            .map(ThrottleReasons::from_bits)
    }

    // Modes

    pub fn persistence_mode(&self) -> Result<bool, NvmlError> {
        self.get_bool("nvmlDeviceGetPersistenceMode")
    }

    pub fn compute_mode(&self) -> Result<ComputeMode, NvmlError> {
        self.get_u32("nvmlDeviceGetComputeMode")
            .map(ComputeMode::from_raw)
    }

    /// Whether a display is connected
    pub fn display_mode(&self) -> Result<bool, NvmlError> {
        self.get_bool("nvmlDeviceGetDisplayMode")
    }

    /// Whether a display is initialized on the GPU
    pub fn display_active(&self) -> Result<bool, NvmlError> {
        self.get_bool("nvmlDeviceGetDisplayActive")
    }

    pub fn gpu_operation_mode(&self) -> Result<OperationModes, NvmlError> {
        let (current, pending) = self.get_pair("nvmlDeviceGetGpuOperationMode")?;
        Ok(OperationModes {
            current: GpuOperationMode::from_raw(current),
            pending: GpuOperationMode::from_raw(pending),
        })
    }

    pub fn api_restriction(&self, api: RestrictedApi) -> Result<bool, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetAPIRestriction", api.as_raw())
            .map(|state| state != DISABLED)
    }

    // ECC

    pub fn ecc_mode(&self) -> Result<EccMode, NvmlError> {
        let (current, pending) = self.get_pair("nvmlDeviceGetEccMode")?;
        Ok(EccMode {
            current: current != DISABLED,
            pending: pending != DISABLED,
        })
    }

    pub fn total_ecc_errors(
        &self,
        error_type: MemoryErrorType,
        counter: EccCounterType,
    ) -> Result<u64, NvmlError> {
        type TotalEccFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, c_uint, *mut c_ulonglong) -> c_uint;

        let mut count: c_ulonglong = 0;
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetTotalEccErrors", |f: TotalEccFn| {
                f(self.handle, error_type.as_raw(), counter.as_raw(), &mut count)
            })?
        };
        Ok(count)
    }

    pub fn detailed_ecc_errors(
        &self,
        error_type: MemoryErrorType,
        counter: EccCounterType,
    ) -> Result<EccErrorCounts, NvmlError> {
        type DetailedEccFn =
            unsafe extern "C" fn(nvmlDevice_t, c_uint, c_uint, *mut nvmlEccErrorCounts_t) -> c_uint;

        let mut raw = nvmlEccErrorCounts_t::default();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetDetailedEccErrors", |f: DetailedEccFn| {
                f(self.handle, error_type.as_raw(), counter.as_raw(), &mut raw)
            })?
        };
        Ok(EccErrorCounts {
            l1_cache: raw.l1_cache,
            l2_cache: raw.l2_cache,
            device_memory: raw.device_memory,
            register_file: raw.register_file,
        })
    }

    pub fn memory_error_counter(
        &self,
        error_type: MemoryErrorType,
        counter: EccCounterType,
        location: MemoryLocation,
    ) -> Result<u64, NvmlError> {
        type MemoryErrorFn =
            unsafe extern "C" fn(nvmlDevice_t, c_uint, c_uint, c_uint, *mut c_ulonglong) -> c_uint;

        let mut count: c_ulonglong = 0;
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetMemoryErrorCounter", |f: MemoryErrorFn| {
                f(
                    self.handle,
                    error_type.as_raw(),
                    counter.as_raw(),
                    location.as_raw(),
                    &mut count,
                )
            })?
        };
        Ok(count)
    }

    /// Physical addresses of pages retired for `cause`
    pub fn retired_pages(&self, cause: PageRetirementCause) -> Result<Vec<u64>, NvmlError> {
        type RetiredPagesFn =
            unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_uint, *mut c_ulonglong) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call_list(
                "nvmlDeviceGetRetiredPages",
                0,
                |f: RetiredPagesFn, count, addresses| {
                    f(self.handle, cause.as_raw(), count, addresses)
                },
            )
        }
    }

    /// Whether retired pages are waiting for a reboot
    pub fn retired_pages_pending(&self) -> Result<bool, NvmlError> {
        self.get_bool("nvmlDeviceGetRetiredPagesPendingStatus")
    }

    // PCIe

    pub fn current_pcie_link_generation(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetCurrPcieLinkGeneration")
    }

    pub fn max_pcie_link_generation(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetMaxPcieLinkGeneration")
    }

    pub fn current_pcie_link_width(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetCurrPcieLinkWidth")
    }

    pub fn max_pcie_link_width(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetMaxPcieLinkWidth")
    }

    /// PCIe throughput in KB/s over the last 20ms
    pub fn pcie_throughput(&self, counter: PcieUtilCounter) -> Result<u32, NvmlError> {
        self.get_keyed_u32("nvmlDeviceGetPcieThroughput", counter.as_raw())
    }

    pub fn pcie_replay_counter(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetPcieReplayCounter")
    }

    // Processes

    pub fn running_compute_processes(&self) -> Result<Vec<ProcessInfo>, NvmlError> {
        self.processes("nvmlDeviceGetComputeRunningProcesses", ProcessType::Compute)
    }

    pub fn running_graphics_processes(&self) -> Result<Vec<ProcessInfo>, NvmlError> {
        self.processes("nvmlDeviceGetGraphicsRunningProcesses", ProcessType::Graphics)
    }

    // Firmware

    pub fn vbios_version(&self) -> Result<String, NvmlError> {
        self.get_string("nvmlDeviceGetVbiosVersion", sys::DEVICE_VBIOS_VERSION_BUFFER_SIZE)
    }

    /// Version of one InfoROM object
    pub fn inforom_version(&self, object: InforomObject) -> Result<String, NvmlError> {
        type InforomVersionFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_char, c_uint) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call_string(
                "nvmlDeviceGetInforomVersion",
                sys::DEVICE_INFOROM_VERSION_BUFFER_SIZE,
                |f: InforomVersionFn, buffer, len| f(self.handle, object.as_raw(), buffer, len),
            )
        }
    }

    pub fn inforom_image_version(&self) -> Result<String, NvmlError> {
        self.get_string(
            "nvmlDeviceGetInforomImageVersion",
            sys::DEVICE_INFOROM_VERSION_BUFFER_SIZE,
        )
    }

    pub fn inforom_configuration_checksum(&self) -> Result<u32, NvmlError> {
        self.get_u32("nvmlDeviceGetInforomConfigurationChecksum")
    }

    /// Verify the InfoROM checksum; fails with `CorruptedInforom` if it does not match
    pub fn validate_inforom(&self) -> Result<(), NvmlError> {
        self.run("nvmlDeviceValidateInforom")
    }

    pub fn violation_status(&self, policy: PerfPolicy) -> Result<ViolationTime, NvmlError> {
        type ViolationFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut nvmlViolationTime_t) -> c_uint;

        let mut raw = nvmlViolationTime_t::default();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetViolationStatus", |f: ViolationFn| {
                f(self.handle, policy.as_raw(), &mut raw)
            })?
        };
        Ok(ViolationTime {
            reference_time_ns: raw.reference_time,
            violation_time_ns: raw.violation_time,
        })
    }

    /// Bridge chips between the GPU and the host, nearest first
    pub fn bridge_chip_info(&self) -> Result<Vec<BridgeChipInfo>, NvmlError> {
        type BridgeChipFn =
            unsafe extern "C" fn(nvmlDevice_t, *mut nvmlBridgeChipHierarchy_t) -> c_uint;

        let mut raw = nvmlBridgeChipHierarchy_t::default();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetBridgeChipInfo", |f: BridgeChipFn| {
                f(self.handle, &mut raw)
            })?
        };

        let count = (raw.bridge_count as usize).min(sys::MAX_PHYSICAL_BRIDGE);
        Ok(raw.bridge_chip_info[..count]
            .iter()
            .map(|chip| BridgeChipInfo {
                chip_type: BridgeChipType::from_raw(chip.chip_type),
                fw_version: chip.fw_version,
            })
            .collect())
    }

    // Topology

    /// CPUs this GPU has affinity with
    pub fn cpu_affinity(&self) -> Result<Vec<u32>, NvmlError> {
        type CpuAffinityFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_ulong) -> c_uint;

        let mut cpu_set: Vec<c_ulong> = vec![0; sys::CPU_SET_WORDS];
        // SAFETY: signature matches nvml.h; size is the buffer length in words.
        unsafe {
            self.nvml.call("nvmlDeviceGetCpuAffinity", |f: CpuAffinityFn| {
                f(self.handle, cpu_set.len() as c_uint, cpu_set.as_mut_ptr())
            })?
        };
        Ok(cpu_set_to_cores(&cpu_set))
    }

    /// Closest common ancestor of this GPU and `other`
    pub fn topology_common_ancestor(&self, other: &Device<'_, S>) -> Result<TopologyLevel, NvmlError> {
        type CommonAncestorFn = unsafe extern "C" fn(nvmlDevice_t, nvmlDevice_t, *mut c_uint) -> c_uint;

        let mut level: c_uint = 0;
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceGetTopologyCommonAncestor", |f: CommonAncestorFn| {
                f(self.handle, other.handle, &mut level)
            })?
        };
        Ok(TopologyLevel::from_raw(level))
    }

    /// GPUs at or closer than `level`
    pub fn topology_nearest_gpus(&self, level: TopologyLevel) -> Result<Vec<Device<'nvml, S>>, NvmlError> {
        type NearestGpusFn =
            unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_uint, *mut nvmlDevice_t) -> c_uint;

        // SAFETY: signature matches nvml.h
        let handles = unsafe {
            self.nvml.call_list(
                "nvmlDeviceGetTopologyNearestGpus",
                ptr::null_mut(),
                |f: NearestGpusFn, count, devices| f(self.handle, level.as_raw(), count, devices),
            )?
        };
        Ok(handles
            .into_iter()
            .map(|handle| Device::new(self.nvml, handle))
            .collect())
    }

    pub fn on_same_board(&self, other: &Device<'_, S>) -> Result<bool, NvmlError> {
        type SameBoardFn = unsafe extern "C" fn(nvmlDevice_t, nvmlDevice_t, *mut c_int) -> c_uint;

        let mut same: c_int = 0;
        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceOnSameBoard", |f: SameBoardFn| {
                f(self.handle, other.handle, &mut same)
            })?
        };
        Ok(same != 0)
    }

    // Commands. Most need root.

    /// Bind the calling thread to this GPU's CPUs
    pub fn set_cpu_affinity(&self) -> Result<(), NvmlError> {
        self.run("nvmlDeviceSetCpuAffinity")
    }

    pub fn clear_cpu_affinity(&self) -> Result<(), NvmlError> {
        self.run("nvmlDeviceClearCpuAffinity")
    }

    pub fn set_persistence_mode(&self, enabled: bool) -> Result<(), NvmlError> {
        self.set("nvmlDeviceSetPersistenceMode", enable_state(enabled))
    }

    pub fn set_compute_mode(&self, mode: ComputeMode) -> Result<(), NvmlError> {
        self.set("nvmlDeviceSetComputeMode", mode.as_raw())
    }

    /// Takes effect after the next reboot
    pub fn set_ecc_mode(&self, enabled: bool) -> Result<(), NvmlError> {
        self.set("nvmlDeviceSetEccMode", enable_state(enabled))
    }

    /// Takes effect after the next reboot
    pub fn set_gpu_operation_mode(&self, mode: GpuOperationMode) -> Result<(), NvmlError> {
        self.set("nvmlDeviceSetGpuOperationMode", mode.as_raw())
    }

    /// Set the power limit in milliwatts
    pub fn set_power_management_limit(&self, limit_mw: u32) -> Result<(), NvmlError> {
        self.set("nvmlDeviceSetPowerManagementLimit", limit_mw)
    }

    pub fn set_applications_clocks(&self, memory_mhz: u32, graphics_mhz: u32) -> Result<(), NvmlError> {
        type SetClocksFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, c_uint) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceSetApplicationsClocks", |f: SetClocksFn| {
                f(self.handle, memory_mhz, graphics_mhz)
            })
        }
    }

    pub fn reset_applications_clocks(&self) -> Result<(), NvmlError> {
        self.run("nvmlDeviceResetApplicationsClocks")
    }

    pub fn set_auto_boosted_clocks(&self, enabled: bool) -> Result<(), NvmlError> {
        self.set("nvmlDeviceSetAutoBoostedClocksEnabled", enable_state(enabled))
    }

    /// Set the auto boost default that applies once no client holds the GPU
    pub fn set_default_auto_boosted_clocks(&self, enabled: bool) -> Result<(), NvmlError> {
        type SetDefaultBoostFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, c_uint) -> c_uint;

        // SAFETY: signature matches nvml.h; flags are reserved and must be 0.
        unsafe {
            self.nvml.call(
                "nvmlDeviceSetDefaultAutoBoostedClocksEnabled",
                |f: SetDefaultBoostFn| f(self.handle, enable_state(enabled), 0),
            )
        }
    }

    pub fn set_api_restriction(&self, api: RestrictedApi, restricted: bool) -> Result<(), NvmlError> {
        type SetRestrictionFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, c_uint) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceSetAPIRestriction", |f: SetRestrictionFn| {
                f(self.handle, api.as_raw(), enable_state(restricted))
            })
        }
    }

    pub fn clear_ecc_error_counts(&self, counter: EccCounterType) -> Result<(), NvmlError> {
        self.set("nvmlDeviceClearEccErrorCounts", counter.as_raw())
    }
}
