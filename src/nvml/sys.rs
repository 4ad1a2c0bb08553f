//! C layouts and entry point shapes
//!
//! Structs mirror `nvml.h`. Where NVML grew a struct between versions the
//! larger layout is declared, so older drivers writing fewer bytes stay in
//! bounds.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_uint, c_ulong, c_ulonglong};

pub use nvml_wrapper_sys::bindings::{nvmlDevice_t, nvmlEventSet_t};

pub(crate) const DEVICE_NAME_BUFFER_SIZE: usize = 96;
pub(crate) const DEVICE_UUID_BUFFER_SIZE: usize = 80;
pub(crate) const DEVICE_SERIAL_BUFFER_SIZE: usize = 30;
pub(crate) const SYSTEM_DRIVER_VERSION_BUFFER_SIZE: usize = 80;
pub(crate) const SYSTEM_NVML_VERSION_BUFFER_SIZE: usize = 80;
pub(crate) const DEVICE_VBIOS_VERSION_BUFFER_SIZE: usize = 32;
pub(crate) const DEVICE_INFOROM_VERSION_BUFFER_SIZE: usize = 16;
pub(crate) const PROCESS_NAME_BUFFER_SIZE: usize = 256;
pub(crate) const DEVICE_PCI_BUS_ID_BUFFER_SIZE: usize = 32;
pub(crate) const DEVICE_PCI_BUS_ID_LEGACY_BUFFER_SIZE: usize = 16;
pub(crate) const HWBC_FIRMWARE_VERSION_BUFFER_SIZE: usize = 32;
pub(crate) const MAX_PHYSICAL_BRIDGE: usize = 128;

/// CPU affinity mask length, enough for 1024 CPUs
pub(crate) const CPU_SET_WORDS: usize = 1024 / c_ulong::BITS as usize;

/// `nvmlTemperatureSensors_t` value for the GPU die
pub(crate) const TEMPERATURE_GPU: c_uint = 0;

// Entry point shapes shared by many functions. Each returns nvmlReturn_t.
pub(crate) type NoArgsFn = unsafe extern "C" fn() -> c_uint;
pub(crate) type StringFn = unsafe extern "C" fn(*mut c_char, c_uint) -> c_uint;
pub(crate) type DeviceActionFn = unsafe extern "C" fn(nvmlDevice_t) -> c_uint;
pub(crate) type DeviceU32Fn = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint) -> c_uint;
pub(crate) type DeviceU64Fn = unsafe extern "C" fn(nvmlDevice_t, *mut c_ulonglong) -> c_uint;
pub(crate) type DevicePairFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint, *mut c_uint) -> c_uint;
pub(crate) type DeviceKeyedU32Fn = unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut c_uint) -> c_uint;
pub(crate) type DeviceStringFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_char, c_uint) -> c_uint;
pub(crate) type DeviceSetFn = unsafe extern "C" fn(nvmlDevice_t, c_uint) -> c_uint;
pub(crate) type DeviceListFn<T> = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint, *mut T) -> c_uint;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlMemory_t {
    pub total: c_ulonglong,
    pub free: c_ulonglong,
    pub used: c_ulonglong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlBAR1Memory_t {
    pub bar1_total: c_ulonglong,
    pub bar1_free: c_ulonglong,
    pub bar1_used: c_ulonglong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlUtilization_t {
    pub gpu: c_uint,
    pub memory: c_uint,
}

/// `nvmlPciInfo_t` as filled by `nvmlDeviceGetPciInfo_v3`
///
/// The older entry point writes its bus ID where `bus_id_legacy` sits and
/// leaves the tail untouched.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct nvmlPciInfo_t {
    pub bus_id_legacy: [c_char; DEVICE_PCI_BUS_ID_LEGACY_BUFFER_SIZE],
    pub domain: c_uint,
    pub bus: c_uint,
    pub device: c_uint,
    pub pci_device_id: c_uint,
    pub pci_sub_system_id: c_uint,
    pub bus_id: [c_char; DEVICE_PCI_BUS_ID_BUFFER_SIZE],
}

impl Default for nvmlPciInfo_t {
    fn default() -> Self {
        Self {
            bus_id_legacy: [0; DEVICE_PCI_BUS_ID_LEGACY_BUFFER_SIZE],
            domain: 0,
            bus: 0,
            device: 0,
            pci_device_id: 0,
            pci_sub_system_id: 0,
            bus_id: [0; DEVICE_PCI_BUS_ID_BUFFER_SIZE],
        }
    }
}

/// Version 1 process record, as the unversioned process queries fill it
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlProcessInfo_t {
    pub pid: c_uint,
    pub used_gpu_memory: c_ulonglong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlEccErrorCounts_t {
    pub l1_cache: c_ulonglong,
    pub l2_cache: c_ulonglong,
    pub device_memory: c_ulonglong,
    pub register_file: c_ulonglong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlViolationTime_t {
    pub reference_time: c_ulonglong,
    pub violation_time: c_ulonglong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct nvmlHwbcEntry_t {
    pub hwbc_id: c_uint,
    pub firmware_version: [c_char; HWBC_FIRMWARE_VERSION_BUFFER_SIZE],
}

impl Default for nvmlHwbcEntry_t {
    fn default() -> Self {
        Self {
            hwbc_id: 0,
            firmware_version: [0; HWBC_FIRMWARE_VERSION_BUFFER_SIZE],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlBridgeChipInfo_t {
    pub chip_type: c_uint,
    pub fw_version: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct nvmlBridgeChipHierarchy_t {
    pub bridge_count: u8,
    pub bridge_chip_info: [nvmlBridgeChipInfo_t; MAX_PHYSICAL_BRIDGE],
}

impl Default for nvmlBridgeChipHierarchy_t {
    fn default() -> Self {
        Self {
            bridge_count: 0,
            bridge_chip_info: [nvmlBridgeChipInfo_t::default(); MAX_PHYSICAL_BRIDGE],
        }
    }
}

/// `nvmlValue_t`; which member is live depends on `nvmlValueType_t`
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) union nvmlValue_t {
    pub d_val: f64,
    pub ui_val: c_uint,
    pub ul_val: c_ulong,
    pub ull_val: c_ulonglong,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct nvmlSample_t {
    pub time_stamp: c_ulonglong,
    pub sample_value: nvmlValue_t,
}

impl Default for nvmlSample_t {
    fn default() -> Self {
        Self {
            time_stamp: 0,
            sample_value: nvmlValue_t { ull_val: 0 },
        }
    }
}

pub(crate) const VALUE_TYPE_DOUBLE: c_uint = 0;
pub(crate) const VALUE_TYPE_UNSIGNED_INT: c_uint = 1;
pub(crate) const VALUE_TYPE_UNSIGNED_LONG: c_uint = 2;
pub(crate) const VALUE_TYPE_UNSIGNED_LONG_LONG: c_uint = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct nvmlProcessUtilizationSample_t {
    pub pid: c_uint,
    pub time_stamp: c_ulonglong,
    pub sm_util: c_uint,
    pub mem_util: c_uint,
    pub enc_util: c_uint,
    pub dec_util: c_uint,
}

/// `nvmlEventData_t` including the MIG instance fields newer drivers write
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct nvmlEventData_t {
    pub device: nvmlDevice_t,
    pub event_type: c_ulonglong,
    pub event_data: c_ulonglong,
    pub gpu_instance_id: c_uint,
    pub compute_instance_id: c_uint,
}

impl Default for nvmlEventData_t {
    fn default() -> Self {
        Self {
            device: std::ptr::null_mut(),
            event_type: 0,
            event_data: 0,
            gpu_instance_id: 0,
            compute_instance_id: 0,
        }
    }
}

/// Read a NUL-terminated string out of an NVML character buffer
///
/// Stops at the first NUL, or the end of the buffer if there is none, and
/// replaces invalid UTF-8.
pub(crate) fn string_from_buffer(buffer: &[c_char]) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
