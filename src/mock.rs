//! Fake NVML library for testing
//!
//! [`FakeLibrary`] implements [`SymbolSource`] over a table of in-process
//! `extern "C"` functions that behave like a small NVML. Device handles are
//! pointers to [`FakeDevice`] records owned by the library.
//!
//! Entry points without a device argument (`nvmlInit`, `nvmlDeviceGetCount`,
//! ...) read the library most recently looked up on the current thread. Every
//! call resolves right before invoking, so that is always the right one.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_uint, c_ulong, c_ulonglong};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::dl::SymbolSource;
use crate::domain::EventTypes;
use crate::nvml::sys::{
    nvmlDevice_t, nvmlEventData_t, nvmlEventSet_t, nvmlHwbcEntry_t, nvmlMemory_t, nvmlPciInfo_t,
    nvmlProcessInfo_t, nvmlProcessUtilizationSample_t, nvmlSample_t, nvmlValue_t,
    VALUE_TYPE_UNSIGNED_INT,
};

const SUCCESS: c_uint = 0;
const UNINITIALIZED: c_uint = 1;
const INVALID_ARGUMENT: c_uint = 2;
const NOT_SUPPORTED: c_uint = 3;
const NO_PERMISSION: c_uint = 4;
const NOT_FOUND: c_uint = 6;
const INSUFFICIENT_SIZE: c_uint = 7;
const TIMEOUT: c_uint = 10;

pub const DRIVER_VERSION: &str = "535.104.05";
pub const NVML_VERSION: &str = "12.535.104.05";

thread_local! {
    static ACTIVE: RefCell<Option<Arc<FakeState>>> = const { RefCell::new(None) };
}

/// A fake GPU
#[derive(Debug, Clone)]
pub struct FakeDevice {
    index: u32,
    name: String,
    uuid: String,
    serial: String,
    bus_id: String,
    memory_total: u64,
    memory_used: u64,
    processes: Vec<(u32, u64)>,
    throttle_reasons: u64,
    cpus: Vec<u32>,
    samples: Vec<u32>,
    events: Vec<(EventTypes, u64)>,
}

impl FakeDevice {
    /// Create a device with the given name and UUID
    pub fn new(name: &str, uuid: &str) -> Self {
        Self {
            index: 0,
            name: name.to_string(),
            uuid: uuid.to_string(),
            serial: String::new(),
            bus_id: "00000000:01:00.0".to_string(),
            memory_total: 16 * 1024 * 1024 * 1024,
            memory_used: 0,
            processes: Vec::new(),
            throttle_reasons: 0,
            cpus: Vec::new(),
            samples: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Builder: set the PCI bus ID
    pub fn with_bus_id(mut self, bus_id: &str) -> Self {
        self.bus_id = bus_id.to_string();
        self
    }

    /// Builder: set the board serial number
    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = serial.to_string();
        self
    }

    /// Builder: set memory totals in bytes
    pub fn with_memory(mut self, total: u64, used: u64) -> Self {
        self.memory_total = total;
        self.memory_used = used;
        self
    }

    /// Builder: add a compute process
    pub fn with_process(mut self, pid: u32, used_memory: u64) -> Self {
        self.processes.push((pid, used_memory));
        self
    }

    /// Builder: set the current throttle reason bits
    pub fn with_throttle_reasons(mut self, bits: u64) -> Self {
        self.throttle_reasons = bits;
        self
    }

    /// Builder: set the CPU affinity
    pub fn with_cpus(mut self, cpus: &[u32]) -> Self {
        self.cpus = cpus.to_vec();
        self
    }

    /// Builder: set the GPU utilization sample buffer
    pub fn with_samples(mut self, values: &[u32]) -> Self {
        self.samples = values.to_vec();
        self
    }

    /// Builder: queue an event delivered once the type is registered
    pub fn with_event(mut self, event_type: EventTypes, data: u64) -> Self {
        self.events.push((event_type, data));
        self
    }

    fn bus(&self) -> c_uint {
        self.bus_id
            .split(':')
            .nth(1)
            .and_then(|bus| c_uint::from_str_radix(bus, 16).ok())
            .unwrap_or(0)
    }

    fn handle(&self) -> nvmlDevice_t {
        self as *const FakeDevice as nvmlDevice_t
    }
}

#[derive(Debug, Default)]
struct FakeState {
    init_status: c_uint,
    shutdown_status: c_uint,
    devices: Vec<FakeDevice>,
    hic_versions: Vec<(u32, String)>,
    hidden: HashSet<String>,
    lookups: AtomicUsize,
    init_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    live_event_sets: AtomicUsize,
}

/// In-process stand-in for `libnvidia-ml`
#[derive(Debug, Clone)]
pub struct FakeLibrary {
    state: Arc<FakeState>,
}

impl FakeLibrary {
    /// A library with no devices whose `nvmlInit` succeeds
    pub fn new() -> Self {
        Self {
            state: Arc::new(FakeState::default()),
        }
    }

    fn configure(&mut self) -> &mut FakeState {
        Arc::get_mut(&mut self.state).expect("configure the fake before sharing it")
    }

    /// Builder: make `nvmlInit` return `status`
    pub fn with_init_status(mut self, status: u32) -> Self {
        self.configure().init_status = status;
        self
    }

    /// Builder: make `nvmlShutdown` return `status`
    pub fn with_shutdown_status(mut self, status: u32) -> Self {
        self.configure().shutdown_status = status;
        self
    }

    /// Builder: add a host bridge firmware entry
    pub fn with_hic_version(mut self, id: u32, firmware_version: &str) -> Self {
        self.configure()
            .hic_versions
            .push((id, firmware_version.to_string()));
        self
    }

    /// Builder: add a device
    pub fn with_device(mut self, mut device: FakeDevice) -> Self {
        let state = self.configure();
        device.index = state.devices.len() as u32;
        state.devices.push(device);
        self
    }

    /// Builder: pretend the library does not export `name`
    pub fn without_export(mut self, name: &str) -> Self {
        self.configure().hidden.insert(name.to_string());
        self
    }

    /// Number of `address` lookups so far
    pub fn lookups(&self) -> usize {
        self.state.lookups.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.state.init_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.state.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Event sets created and not yet freed
    pub fn live_event_sets(&self) -> usize {
        self.state.live_event_sets.load(Ordering::SeqCst)
    }
}

impl Default for FakeLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolSource for FakeLibrary {
    fn address(&self, name: &CStr) -> Option<NonNull<c_void>> {
        self.state.lookups.fetch_add(1, Ordering::SeqCst);
        ACTIVE.with(|active| *active.borrow_mut() = Some(Arc::clone(&self.state)));

        let name = name.to_str().ok()?;
        if self.state.hidden.contains(name) {
            return None;
        }
        NonNull::new(export(name)?)
    }

    fn describe(&self) -> String {
        "fake-nvml".to_string()
    }
}

fn export(name: &str) -> Option<*mut c_void> {
    let address = match name {
        "nvmlInit_v2" | "nvmlInit" => init as *mut c_void,
        "nvmlShutdown" => shutdown as *mut c_void,
        "nvmlErrorString" => error_string as *mut c_void,
        "nvmlSystemGetDriverVersion" => driver_version as *mut c_void,
        "nvmlSystemGetNVMLVersion" => nvml_version as *mut c_void,
        "nvmlDeviceGetCount_v2" => device_count as *mut c_void,
        "nvmlDeviceGetHandleByIndex_v2" => handle_by_index as *mut c_void,
        "nvmlDeviceGetHandleByUUID" => handle_by_uuid as *mut c_void,
        "nvmlDeviceGetHandleByPciBusId_v2" => handle_by_pci_bus_id as *mut c_void,
        "nvmlDeviceGetHandleBySerial" => handle_by_serial as *mut c_void,
        "nvmlSystemGetTopologyGpuSet" => topology_gpu_set as *mut c_void,
        "nvmlSystemGetHicVersion" => hic_version as *mut c_void,
        "nvmlDeviceGetName" => device_name as *mut c_void,
        "nvmlDeviceGetUUID" => device_uuid as *mut c_void,
        "nvmlDeviceGetIndex" => device_index as *mut c_void,
        "nvmlDeviceGetMemoryInfo" => memory_info as *mut c_void,
        "nvmlDeviceGetPciInfo_v3" => pci_info as *mut c_void,
        "nvmlDeviceGetComputeRunningProcesses" => running_processes as *mut c_void,
        "nvmlDeviceGetFanSpeed" => not_supported as *mut c_void,
        "nvmlDeviceSetPersistenceMode" => no_permission as *mut c_void,
        "nvmlDeviceGetCurrentClocksThrottleReasons" => throttle_reasons as *mut c_void,
        "nvmlDeviceGetCpuAffinity" => cpu_affinity as *mut c_void,
        "nvmlDeviceGetTopologyCommonAncestor" => common_ancestor as *mut c_void,
        "nvmlDeviceGetSamples" => samples as *mut c_void,
        "nvmlDeviceGetProcessUtilization" => process_utilization as *mut c_void,
        "nvmlDeviceGetSupportedEventTypes" => supported_event_types as *mut c_void,
        "nvmlDeviceRegisterEvents" => register_events as *mut c_void,
        "nvmlEventSetCreate" => event_set_create as *mut c_void,
        "nvmlEventSetWait" => event_set_wait as *mut c_void,
        "nvmlEventSetFree" => event_set_free as *mut c_void,
        _ => return None,
    };
    Some(address)
}

fn with_state(f: impl FnOnce(&FakeState) -> c_uint) -> c_uint {
    ACTIVE.with(|active| match active.borrow().as_ref() {
        Some(state) => f(state),
        None => UNINITIALIZED,
    })
}

/// # Safety
/// `handle` must come from a live [`FakeLibrary`].
unsafe fn device<'a>(handle: nvmlDevice_t) -> Option<&'a FakeDevice> {
    unsafe { (handle as *const FakeDevice).as_ref() }
}

unsafe fn write_string(buffer: *mut c_char, len: c_uint, value: &str) -> c_uint {
    if buffer.is_null() || value.len() + 1 > len as usize {
        return INSUFFICIENT_SIZE;
    }
    unsafe {
        ptr::copy_nonoverlapping(value.as_ptr() as *const c_char, buffer, value.len());
        *buffer.add(value.len()) = 0;
    }
    SUCCESS
}

/// Shared two-call behavior: report the size, or fill if the buffer fits
unsafe fn fill_list<T>(count: *mut c_uint, buffer: *mut T, items: &[T]) -> c_uint
where
    T: Copy,
{
    if count.is_null() {
        return INVALID_ARGUMENT;
    }
    unsafe {
        let capacity = *count as usize;
        *count = items.len() as c_uint;
        if items.is_empty() {
            return SUCCESS;
        }
        if buffer.is_null() || capacity < items.len() {
            return INSUFFICIENT_SIZE;
        }
        ptr::copy_nonoverlapping(items.as_ptr(), buffer, items.len());
    }
    SUCCESS
}

extern "C" fn init() -> c_uint {
    with_state(|state| {
        state.init_calls.fetch_add(1, Ordering::SeqCst);
        state.init_status
    })
}

extern "C" fn shutdown() -> c_uint {
    with_state(|state| {
        state.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        state.shutdown_status
    })
}

extern "C" fn error_string(code: c_uint) -> *const c_char {
    let message: &'static [u8] = match code {
        NOT_SUPPORTED => b"Not Supported\0",
        INSUFFICIENT_SIZE => b"Insufficient Size\0",
        9 => b"Driver Not Loaded\0",
        _ => b"Unknown Error\0",
    };
    message.as_ptr() as *const c_char
}

extern "C" fn driver_version(buffer: *mut c_char, len: c_uint) -> c_uint {
    unsafe { write_string(buffer, len, DRIVER_VERSION) }
}

extern "C" fn nvml_version(buffer: *mut c_char, len: c_uint) -> c_uint {
    unsafe { write_string(buffer, len, NVML_VERSION) }
}

extern "C" fn device_count(count: *mut c_uint) -> c_uint {
    with_state(|state| {
        unsafe { *count = state.devices.len() as c_uint };
        SUCCESS
    })
}

extern "C" fn handle_by_index(index: c_uint, handle: *mut nvmlDevice_t) -> c_uint {
    with_state(|state| match state.devices.get(index as usize) {
        Some(device) => {
            unsafe { *handle = device.handle() };
            SUCCESS
        }
        None => INVALID_ARGUMENT,
    })
}

extern "C" fn handle_by_uuid(uuid: *const c_char, handle: *mut nvmlDevice_t) -> c_uint {
    let uuid = unsafe { CStr::from_ptr(uuid) }.to_string_lossy();
    with_state(|state| match state.devices.iter().find(|d| d.uuid == uuid) {
        Some(device) => {
            unsafe { *handle = device.handle() };
            SUCCESS
        }
        None => NOT_FOUND,
    })
}

extern "C" fn handle_by_pci_bus_id(bus_id: *const c_char, handle: *mut nvmlDevice_t) -> c_uint {
    let bus_id = unsafe { CStr::from_ptr(bus_id) }.to_string_lossy();
    with_state(|state| {
        let found = state.devices.iter().find(|d| {
            d.bus_id.eq_ignore_ascii_case(&bus_id)
                || d.bus_id.get(4..).is_some_and(|short| short.eq_ignore_ascii_case(&bus_id))
        });
        match found {
            Some(device) => {
                unsafe { *handle = device.handle() };
                SUCCESS
            }
            None => NOT_FOUND,
        }
    })
}

extern "C" fn handle_by_serial(serial: *const c_char, handle: *mut nvmlDevice_t) -> c_uint {
    let serial = unsafe { CStr::from_ptr(serial) }.to_string_lossy();
    with_state(|state| {
        match state
            .devices
            .iter()
            .find(|d| !d.serial.is_empty() && d.serial == serial)
        {
            Some(device) => {
                unsafe { *handle = device.handle() };
                SUCCESS
            }
            None => NOT_FOUND,
        }
    })
}

/// Devices whose affinity includes `cpu`
extern "C" fn topology_gpu_set(
    cpu: c_uint,
    count: *mut c_uint,
    devices: *mut nvmlDevice_t,
) -> c_uint {
    with_state(|state| {
        let handles: Vec<nvmlDevice_t> = state
            .devices
            .iter()
            .filter(|d| d.cpus.contains(&cpu))
            .map(FakeDevice::handle)
            .collect();
        unsafe { fill_list(count, devices, &handles) }
    })
}

extern "C" fn hic_version(count: *mut c_uint, entries: *mut nvmlHwbcEntry_t) -> c_uint {
    with_state(|state| {
        let items: Vec<nvmlHwbcEntry_t> = state
            .hic_versions
            .iter()
            .map(|(id, firmware_version)| {
                let mut entry = nvmlHwbcEntry_t {
                    hwbc_id: *id,
                    ..Default::default()
                };
                unsafe {
                    write_string(
                        entry.firmware_version.as_mut_ptr(),
                        entry.firmware_version.len() as c_uint,
                        firmware_version,
                    )
                };
                entry
            })
            .collect();
        unsafe { fill_list(count, entries, &items) }
    })
}

extern "C" fn device_name(handle: nvmlDevice_t, buffer: *mut c_char, len: c_uint) -> c_uint {
    match unsafe { device(handle) } {
        Some(device) => unsafe { write_string(buffer, len, &device.name) },
        None => INVALID_ARGUMENT,
    }
}

extern "C" fn device_uuid(handle: nvmlDevice_t, buffer: *mut c_char, len: c_uint) -> c_uint {
    match unsafe { device(handle) } {
        Some(device) => unsafe { write_string(buffer, len, &device.uuid) },
        None => INVALID_ARGUMENT,
    }
}

extern "C" fn device_index(handle: nvmlDevice_t, index: *mut c_uint) -> c_uint {
    match unsafe { device(handle) } {
        Some(device) => {
            unsafe { *index = device.index };
            SUCCESS
        }
        None => INVALID_ARGUMENT,
    }
}

extern "C" fn memory_info(handle: nvmlDevice_t, memory: *mut nvmlMemory_t) -> c_uint {
    match unsafe { device(handle) } {
        Some(device) => {
            unsafe {
                *memory = nvmlMemory_t {
                    total: device.memory_total,
                    free: device.memory_total.saturating_sub(device.memory_used),
                    used: device.memory_used,
                }
            };
            SUCCESS
        }
        None => INVALID_ARGUMENT,
    }
}

extern "C" fn pci_info(handle: nvmlDevice_t, pci: *mut nvmlPciInfo_t) -> c_uint {
    let Some(device) = (unsafe { device(handle) }) else {
        return INVALID_ARGUMENT;
    };
    let mut info = nvmlPciInfo_t {
        bus: device.bus(),
        ..Default::default()
    };
    // The legacy field holds the short form without the upper domain digits
    let legacy = device.bus_id.get(4..).unwrap_or(&device.bus_id);
    unsafe {
        write_string(info.bus_id.as_mut_ptr(), info.bus_id.len() as c_uint, &device.bus_id);
        write_string(
            info.bus_id_legacy.as_mut_ptr(),
            info.bus_id_legacy.len() as c_uint,
            legacy,
        );
        *pci = info;
    }
    SUCCESS
}

extern "C" fn running_processes(
    handle: nvmlDevice_t,
    count: *mut c_uint,
    infos: *mut nvmlProcessInfo_t,
) -> c_uint {
    let Some(device) = (unsafe { device(handle) }) else {
        return INVALID_ARGUMENT;
    };
    let processes: Vec<nvmlProcessInfo_t> = device
        .processes
        .iter()
        .map(|&(pid, used_gpu_memory)| nvmlProcessInfo_t {
            pid,
            used_gpu_memory,
        })
        .collect();
    unsafe { fill_list(count, infos, &processes) }
}

extern "C" fn not_supported(_handle: nvmlDevice_t, _value: *mut c_uint) -> c_uint {
    NOT_SUPPORTED
}

extern "C" fn no_permission(_handle: nvmlDevice_t, _value: c_uint) -> c_uint {
    NO_PERMISSION
}

extern "C" fn throttle_reasons(handle: nvmlDevice_t, reasons: *mut c_ulonglong) -> c_uint {
    match unsafe { device(handle) } {
        Some(device) => {
            unsafe { *reasons = device.throttle_reasons };
            SUCCESS
        }
        None => INVALID_ARGUMENT,
    }
}

extern "C" fn cpu_affinity(handle: nvmlDevice_t, size: c_uint, cpu_set: *mut c_ulong) -> c_uint {
    let Some(device) = (unsafe { device(handle) }) else {
        return INVALID_ARGUMENT;
    };
    for &cpu in &device.cpus {
        let word = (cpu / c_ulong::BITS) as usize;
        if word >= size as usize {
            return INSUFFICIENT_SIZE;
        }
        unsafe { *cpu_set.add(word) |= 1 << (cpu % c_ulong::BITS) };
    }
    SUCCESS
}

extern "C" fn common_ancestor(first: nvmlDevice_t, second: nvmlDevice_t, level: *mut c_uint) -> c_uint {
    unsafe { *level = if first == second { 0 } else { 30 } };
    SUCCESS
}

extern "C" fn samples(
    handle: nvmlDevice_t,
    _sampling: c_uint,
    _last_seen: c_ulonglong,
    value_type: *mut c_uint,
    count: *mut c_uint,
    buffer: *mut nvmlSample_t,
) -> c_uint {
    let Some(device) = (unsafe { device(handle) }) else {
        return INVALID_ARGUMENT;
    };
    let samples: Vec<nvmlSample_t> = device
        .samples
        .iter()
        .enumerate()
        .map(|(i, &value)| nvmlSample_t {
            time_stamp: i as c_ulonglong,
            sample_value: nvmlValue_t { ui_val: value },
        })
        .collect();
    unsafe {
        *value_type = VALUE_TYPE_UNSIGNED_INT;
        fill_list(count, buffer, &samples)
    }
}

extern "C" fn process_utilization(
    handle: nvmlDevice_t,
    buffer: *mut nvmlProcessUtilizationSample_t,
    count: *mut c_uint,
    _last_seen: c_ulonglong,
) -> c_uint {
    let Some(device) = (unsafe { device(handle) }) else {
        return INVALID_ARGUMENT;
    };
    if device.processes.is_empty() {
        return NOT_FOUND;
    }
    let samples: Vec<nvmlProcessUtilizationSample_t> = device
        .processes
        .iter()
        .map(|&(pid, _)| nvmlProcessUtilizationSample_t {
            pid,
            sm_util: 50,
            ..Default::default()
        })
        .collect();
    unsafe { fill_list(count, buffer, &samples) }
}

extern "C" fn supported_event_types(_handle: nvmlDevice_t, types: *mut c_ulonglong) -> c_uint {
    unsafe { *types = EventTypes::ALL.bits() };
    SUCCESS
}

struct FakeEventSet {
    queue: Mutex<VecDeque<(usize, u64, u64)>>,
}

extern "C" fn event_set_create(set: *mut nvmlEventSet_t) -> c_uint {
    with_state(|state| {
        state.live_event_sets.fetch_add(1, Ordering::SeqCst);
        let fake = Box::new(FakeEventSet {
            queue: Mutex::new(VecDeque::new()),
        });
        unsafe { *set = Box::into_raw(fake) as nvmlEventSet_t };
        SUCCESS
    })
}

extern "C" fn register_events(handle: nvmlDevice_t, types: c_ulonglong, set: nvmlEventSet_t) -> c_uint {
    let (Some(device), Some(set)) = (unsafe { device(handle) }, unsafe {
        (set as *const FakeEventSet).as_ref()
    }) else {
        return INVALID_ARGUMENT;
    };
    let Ok(mut queue) = set.queue.lock() else {
        return INVALID_ARGUMENT;
    };
    let registered = EventTypes::from_bits(types);
    for &(event_type, data) in &device.events {
        if registered.contains(event_type) {
            queue.push_back((handle as usize, event_type.bits(), data));
        }
    }
    SUCCESS
}

extern "C" fn event_set_wait(set: nvmlEventSet_t, data: *mut nvmlEventData_t, _timeout_ms: c_uint) -> c_uint {
    let Some(set) = (unsafe { (set as *const FakeEventSet).as_ref() }) else {
        return INVALID_ARGUMENT;
    };
    let Ok(mut queue) = set.queue.lock() else {
        return INVALID_ARGUMENT;
    };
    match queue.pop_front() {
        Some((device, event_type, event_data)) => {
            unsafe {
                *data = nvmlEventData_t {
                    device: device as nvmlDevice_t,
                    event_type,
                    event_data,
                    ..Default::default()
                }
            };
            SUCCESS
        }
        None => TIMEOUT,
    }
}

extern "C" fn event_set_free(set: nvmlEventSet_t) -> c_uint {
    if set.is_null() {
        return INVALID_ARGUMENT;
    }
    drop(unsafe { Box::from_raw(set as *mut FakeEventSet) });
    with_state(|state| {
        state.live_event_sets.fetch_sub(1, Ordering::SeqCst);
        SUCCESS
    })
}
