//! NVML session
//!
//! [`Nvml`] owns a resolver over the loaded library. Every method resolves
//! its entry point at call time, invokes it, and turns the return code into
//! a `Result`.

use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::os::raw::{c_char, c_uint};
use std::ptr;

use crate::dl::source::LoadedLibrary;
use crate::dl::{symbols, LibraryLoader, Resolved, Resolver, SymbolSource};
use crate::domain::HwbcEntry;
use crate::error::{NvmlError, ResolveError};
use crate::nvml::device::Device;
use crate::nvml::return_code::ReturnCode;
use crate::nvml::sys::{self, nvmlDevice_t, nvmlHwbcEntry_t, NoArgsFn, StringFn};

/// Times a list query is retried when the list grows between calls
const LIST_ATTEMPTS: usize = 3;

/// An initialized NVML library
pub struct Nvml<S: SymbolSource = LoadedLibrary> {
    resolver: ManuallyDrop<Resolver<S>>,
    initialized: bool,
}

impl Nvml<LoadedLibrary> {
    /// Load NVML from the default candidates and initialize it
    pub fn init() -> Result<Self, NvmlError> {
        Self::init_with(&LibraryLoader::new())
    }

    /// Load NVML with `loader` and initialize it
    ///
    /// The library is unloaded again if initialization fails.
    pub fn init_with(loader: &LibraryLoader) -> Result<Self, NvmlError> {
        let library = loader.load()?;
        Self::from_source(library)
    }

    /// Shut NVML down and unload the library
    pub fn close(self) -> Result<(), NvmlError> {
        let library = self.shutdown()?;
        LibraryLoader::unload(library)
    }
}

impl<S: SymbolSource> Nvml<S> {
    /// Initialize NVML through an arbitrary symbol source
    pub fn from_source(source: S) -> Result<Self, NvmlError> {
        let mut nvml = Self {
            resolver: ManuallyDrop::new(Resolver::new(source)),
            initialized: false,
        };

        // SAFETY: nvmlInit and nvmlInit_v2 both take no arguments.
        unsafe { nvml.call("nvmlInit", |init: NoArgsFn| init())? };
        nvml.initialized = true;
        log::debug!("NVML initialized via {}", nvml.source().describe());

        Ok(nvml)
    }

    /// Call `nvmlShutdown` and hand back the symbol source
    ///
    /// If `nvmlShutdown` fails the source is dropped and only the error is
    /// returned; for a [`LoadedLibrary`] that releases the handle. Either
    /// way `nvmlShutdown` is called at most once.
    pub fn shutdown(self) -> Result<S, NvmlError> {
        let mut this = ManuallyDrop::new(self);
        let result = this.shutdown_in_place();
        // SAFETY: `this` is never used or dropped again.
        let resolver = unsafe { ManuallyDrop::take(&mut this.resolver) };
        result.map(|()| resolver.into_source())
    }

    fn shutdown_in_place(&mut self) -> Result<(), NvmlError> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        // SAFETY: nvmlShutdown takes no arguments.
        unsafe { self.call("nvmlShutdown", |shutdown: NoArgsFn| shutdown()) }
    }

    /// The symbol source calls are resolved against
    pub fn source(&self) -> &S {
        self.resolver.source()
    }

    /// Resolve an entry point by base name
    ///
    /// Versioned aliases from the entry point table are tried first, newest
    /// first. Names not in the table are resolved verbatim.
    ///
    /// # Safety
    /// `T` must match the signature of whichever candidate resolves.
    pub unsafe fn resolve<T: Copy>(&self, name: &'static str) -> Result<Resolved<'_, T>, NvmlError> {
        unsafe { self.resolve_versioned(name) }.map(|(resolved, _)| resolved)
    }

    /// Like [`Nvml::resolve`], also returning the export that matched
    pub(crate) unsafe fn resolve_versioned<T: Copy>(
        &self,
        name: &'static str,
    ) -> Result<(Resolved<'_, T>, &'static str), NvmlError> {
        let aliases = symbols::lookup(name).map(|e| e.aliases).unwrap_or(&[]);

        for candidate in aliases.iter().copied().chain(std::iter::once(name)) {
            if let Ok(resolved) = unsafe { self.resolver.resolve::<T>(candidate) } {
                if candidate != name {
                    log::debug!("{} resolved as {}", name, candidate);
                }
                return Ok((resolved, candidate));
            }
        }

        Err(ResolveError::SymbolNotFound {
            symbol: name.to_string(),
            library: self.source().describe(),
        }
        .into())
    }

    /// Resolve `function`, invoke it through `invoke`, and check the result
    ///
    /// # Safety
    /// `F` must match the entry point signature and `invoke` must pass valid
    /// arguments.
    pub(crate) unsafe fn call<F: Copy>(
        &self,
        function: &'static str,
        invoke: impl FnOnce(F) -> c_uint,
    ) -> Result<(), NvmlError> {
        let entry = unsafe { self.resolve::<F>(function)? };
        let code = invoke(*entry);
        self.check(function, code)
    }

    /// Map an entry point's return code
    pub(crate) fn check(&self, function: &'static str, code: c_uint) -> Result<(), NvmlError> {
        match ReturnCode::from_raw(code) {
            ReturnCode::Success => Ok(()),
            other => Err(self.error(function, other)),
        }
    }

    pub(crate) fn error(&self, function: &'static str, code: ReturnCode) -> NvmlError {
        match code {
            ReturnCode::Uninitialized => NvmlError::Uninitialized { function },
            ReturnCode::InvalidArgument => NvmlError::InvalidArgument { function },
            ReturnCode::NotSupported => NvmlError::NotSupported { function },
            ReturnCode::NoPermission => NvmlError::NoPermission { function },
            ReturnCode::NotFound => NvmlError::NotFound { function },
            ReturnCode::GpuIsLost => NvmlError::GpuLost { function },
            ReturnCode::Timeout => NvmlError::Timeout { function },
            code => NvmlError::Call {
                function,
                code,
                message: self.error_string(code),
            },
        }
    }

    /// Describe a return code with `nvmlErrorString`
    ///
    /// Falls back to the vendor constant name when the entry point is
    /// missing or returns NULL.
    pub fn error_string(&self, code: ReturnCode) -> String {
        type ErrorStringFn = unsafe extern "C" fn(c_uint) -> *const c_char;

        // SAFETY: signature matches nvml.h; the returned string is static.
        unsafe {
            match self.resolve::<ErrorStringFn>("nvmlErrorString") {
                Ok(error_string) => {
                    let message = error_string(code.as_raw());
                    if message.is_null() {
                        code.name().to_string()
                    } else {
                        CStr::from_ptr(message).to_string_lossy().into_owned()
                    }
                }
                Err(_) => code.name().to_string(),
            }
        }
    }

    /// Fill a fixed-size character buffer and read it back as a string
    ///
    /// # Safety
    /// `F` must match the entry point signature; `invoke` must hand the
    /// buffer and its length to it unchanged.
    pub(crate) unsafe fn call_string<F: Copy>(
        &self,
        function: &'static str,
        len: usize,
        invoke: impl FnOnce(F, *mut c_char, c_uint) -> c_uint,
    ) -> Result<String, NvmlError> {
        let mut buffer = vec![0 as c_char; len];
        let pointer = buffer.as_mut_ptr();
        unsafe { self.call(function, |f: F| invoke(f, pointer, len as c_uint))? };
        Ok(sys::string_from_buffer(&buffer))
    }

    /// Run the two-call list protocol
    ///
    /// `invoke` receives the in/out count and a buffer pointer. The first
    /// call passes NULL to learn the count; then a buffer of that size is
    /// filled and truncated to what was written. If the list grew in between
    /// the fill is retried a few times.
    ///
    /// # Safety
    /// `F` must match the entry point signature and `invoke` must pass the
    /// count and buffer through unchanged.
    pub(crate) unsafe fn call_list<F: Copy, T: Copy>(
        &self,
        function: &'static str,
        zero: T,
        mut invoke: impl FnMut(F, &mut c_uint, *mut T) -> c_uint,
    ) -> Result<Vec<T>, NvmlError> {
        let entry = unsafe { self.resolve::<F>(function)? };

        let mut count: c_uint = 0;
        match ReturnCode::from_raw(invoke(*entry, &mut count, ptr::null_mut())) {
            ReturnCode::Success | ReturnCode::InsufficientSize => {}
            other => return Err(self.error(function, other)),
        }

        for _ in 0..LIST_ATTEMPTS {
            if count == 0 {
                return Ok(Vec::new());
            }

            let mut buffer = vec![zero; count as usize];
            let mut written = count;
            match ReturnCode::from_raw(invoke(*entry, &mut written, buffer.as_mut_ptr())) {
                ReturnCode::Success => {
                    buffer.truncate(written.min(count) as usize);
                    return Ok(buffer);
                }
                ReturnCode::InsufficientSize => {
                    log::debug!("{}: list grew from {} to {}", function, count, written);
                    count = written.max(count.saturating_add(1));
                }
                other => return Err(self.error(function, other)),
            }
        }

        Err(self.error(function, ReturnCode::InsufficientSize))
    }

    /// Version of the installed driver
    pub fn driver_version(&self) -> Result<String, NvmlError> {
        // SAFETY: (char *version, unsigned int length)
        unsafe {
            self.call_string(
                "nvmlSystemGetDriverVersion",
                sys::SYSTEM_DRIVER_VERSION_BUFFER_SIZE,
                |f: StringFn, buffer, len| f(buffer, len),
            )
        }
    }

    /// Version of the NVML library
    pub fn nvml_version(&self) -> Result<String, NvmlError> {
        // SAFETY: (char *version, unsigned int length)
        unsafe {
            self.call_string(
                "nvmlSystemGetNVMLVersion",
                sys::SYSTEM_NVML_VERSION_BUFFER_SIZE,
                |f: StringFn, buffer, len| f(buffer, len),
            )
        }
    }

    /// Name of the process with `pid`
    pub fn process_name(&self, pid: u32) -> Result<String, NvmlError> {
        type ProcessNameFn = unsafe extern "C" fn(c_uint, *mut c_char, c_uint) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.call_string(
                "nvmlSystemGetProcessName",
                sys::PROCESS_NAME_BUFFER_SIZE,
                |f: ProcessNameFn, buffer, len| f(pid, buffer, len),
            )
        }
    }

    /// Number of GPUs NVML can see
    pub fn device_count(&self) -> Result<u32, NvmlError> {
        type DeviceGetCountFn = unsafe extern "C" fn(*mut c_uint) -> c_uint;

        let mut count: c_uint = 0;
        // SAFETY: signature matches nvml.h
        unsafe { self.call("nvmlDeviceGetCount", |f: DeviceGetCountFn| f(&mut count))? };
        Ok(count)
    }

    /// GPUs with affinity to CPU `cpu`
    pub fn topology_gpu_set(&self, cpu: u32) -> Result<Vec<Device<'_, S>>, NvmlError> {
        type TopologyGpuSetFn = unsafe extern "C" fn(c_uint, *mut c_uint, *mut nvmlDevice_t) -> c_uint;

        // SAFETY: signature matches nvml.h; NULL array queries the count.
        let handles = unsafe {
            self.call_list(
                "nvmlSystemGetTopologyGpuSet",
                ptr::null_mut(),
                |f: TopologyGpuSetFn, count, array| f(cpu, count, array),
            )?
        };
        Ok(handles.into_iter().map(|h| Device::new(self, h)).collect())
    }

    /// Host bridge (S-class) firmware versions
    pub fn hic_versions(&self) -> Result<Vec<HwbcEntry>, NvmlError> {
        type HicVersionFn = unsafe extern "C" fn(*mut c_uint, *mut nvmlHwbcEntry_t) -> c_uint;

        // SAFETY: signature matches nvml.h
        let entries = unsafe {
            self.call_list(
                "nvmlSystemGetHicVersion",
                nvmlHwbcEntry_t::default(),
                |f: HicVersionFn, count, entries| f(count, entries),
            )?
        };

        Ok(entries
            .iter()
            .map(|e| HwbcEntry {
                id: e.hwbc_id,
                firmware_version: sys::string_from_buffer(&e.firmware_version),
            })
            .collect())
    }

    /// Device at `index`
    pub fn device_by_index(&self, index: u32) -> Result<Device<'_, S>, NvmlError> {
        type HandleByIndexFn = unsafe extern "C" fn(c_uint, *mut nvmlDevice_t) -> c_uint;

        let mut handle: nvmlDevice_t = ptr::null_mut();
        // SAFETY: signature matches nvml.h
        unsafe {
            self.call("nvmlDeviceGetHandleByIndex", |f: HandleByIndexFn| {
                f(index, &mut handle)
            })?
        };
        Ok(Device::new(self, handle))
    }

    /// Device with the given UUID
    pub fn device_by_uuid(&self, uuid: &str) -> Result<Device<'_, S>, NvmlError> {
        self.device_by_key("nvmlDeviceGetHandleByUUID", uuid)
    }

    /// Device at the given PCI bus ID (`domain:bus:device.function`)
    pub fn device_by_pci_bus_id(&self, bus_id: &str) -> Result<Device<'_, S>, NvmlError> {
        self.device_by_key("nvmlDeviceGetHandleByPciBusId", bus_id)
    }

    /// Device with the given board serial number
    pub fn device_by_serial(&self, serial: &str) -> Result<Device<'_, S>, NvmlError> {
        self.device_by_key("nvmlDeviceGetHandleBySerial", serial)
    }

    fn device_by_key(&self, function: &'static str, key: &str) -> Result<Device<'_, S>, NvmlError> {
        type HandleByKeyFn = unsafe extern "C" fn(*const c_char, *mut nvmlDevice_t) -> c_uint;

        let key = CString::new(key).map_err(|_| NvmlError::InvalidString(key.to_string()))?;
        let mut handle: nvmlDevice_t = ptr::null_mut();
        // SAFETY: signature matches nvml.h; `key` outlives the call.
        unsafe { self.call(function, |f: HandleByKeyFn| f(key.as_ptr(), &mut handle))? };
        Ok(Device::new(self, handle))
    }

    /// Every device, in index order
    pub fn devices(&self) -> Result<Vec<Device<'_, S>>, NvmlError> {
        (0..self.device_count()?)
            .map(|index| self.device_by_index(index))
            .collect()
    }
}

impl<S: SymbolSource> Drop for Nvml<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_in_place() {
            log::warn!("NVML shutdown on drop failed: {}", e);
        }
        // SAFETY: the resolver is not touched after this.
        unsafe { ManuallyDrop::drop(&mut self.resolver) };
    }
}

impl<S: SymbolSource> std::fmt::Debug for Nvml<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nvml")
            .field("source", &self.source().describe())
            .field("initialized", &self.initialized)
            .finish()
    }
}
