//! Event sets
//!
//! An [`EventSet`] collects events from the devices registered with it.
//! Waiting returns `Ok(None)` when the timeout passes without an event.

use std::os::raw::{c_uint, c_ulonglong};
use std::ptr;
use std::time::Duration;

use crate::dl::source::LoadedLibrary;
use crate::dl::SymbolSource;
use crate::domain::{EventData, EventTypes};
use crate::error::NvmlError;
use crate::nvml::device::Device;
use crate::nvml::session::Nvml;
use crate::nvml::sys::{nvmlDevice_t, nvmlEventData_t, nvmlEventSet_t, DeviceU64Fn};

impl<S: SymbolSource> Device<'_, S> {
    /// Event types this device can deliver
    pub fn supported_event_types(&self) -> Result<EventTypes, NvmlError> {
        let mut types: c_ulonglong = 0;
        // SAFETY: (device, unsigned long long *eventTypes)
        unsafe {
            self.nvml()
                .call("nvmlDeviceGetSupportedEventTypes", |f: DeviceU64Fn| {
                    f(self.handle(), &mut types)
                })?
        };
        Ok(EventTypes::from_bits(types))
    }
}

/// A set of registered event sources, freed on drop
pub struct EventSet<'nvml, S: SymbolSource = LoadedLibrary> {
    nvml: &'nvml Nvml<S>,
    set: nvmlEventSet_t,
}

impl<'nvml, S: SymbolSource> EventSet<'nvml, S> {
    /// Create an empty event set
    pub fn new(nvml: &'nvml Nvml<S>) -> Result<Self, NvmlError> {
        type EventSetCreateFn = unsafe extern "C" fn(*mut nvmlEventSet_t) -> c_uint;

        let mut set: nvmlEventSet_t = ptr::null_mut();
        // SAFETY: signature matches nvml.h
        unsafe { nvml.call("nvmlEventSetCreate", |f: EventSetCreateFn| f(&mut set))? };
        Ok(Self { nvml, set })
    }

    /// Deliver `types` events from `device` to this set
    pub fn register(&self, device: &Device<'nvml, S>, types: EventTypes) -> Result<(), NvmlError> {
        type RegisterEventsFn = unsafe extern "C" fn(nvmlDevice_t, c_ulonglong, nvmlEventSet_t) -> c_uint;

        // SAFETY: signature matches nvml.h
        unsafe {
            self.nvml.call("nvmlDeviceRegisterEvents", |f: RegisterEventsFn| {
                f(device.handle(), types.bits(), self.set)
            })
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn wait(&self, timeout: Duration) -> Result<Option<EventData>, NvmlError> {
        type EventSetWaitFn = unsafe extern "C" fn(nvmlEventSet_t, *mut nvmlEventData_t, c_uint) -> c_uint;

        let timeout_ms = timeout.as_millis().min(c_uint::MAX as u128) as c_uint;
        let mut raw = nvmlEventData_t::default();
        // SAFETY: signature matches nvml.h
        let result = unsafe {
            self.nvml.call("nvmlEventSetWait", |f: EventSetWaitFn| {
                f(self.set, &mut raw, timeout_ms)
            })
        };

        match result {
            Ok(()) => {}
            Err(NvmlError::Timeout { .. }) => return Ok(None),
            Err(e) => return Err(e),
        }

        let device_index = if raw.device.is_null() {
            None
        } else {
            Device::new(self.nvml, raw.device).index().ok()
        };

        Ok(Some(EventData {
            device_index,
            event_types: EventTypes::from_bits(raw.event_type),
            data: raw.event_data,
        }))
    }
}

impl<S: SymbolSource> Drop for EventSet<'_, S> {
    fn drop(&mut self) {
        type EventSetFreeFn = unsafe extern "C" fn(nvmlEventSet_t) -> c_uint;

        // SAFETY: signature matches nvml.h; the set is not used afterwards.
        let result = unsafe {
            self.nvml
                .call("nvmlEventSetFree", |f: EventSetFreeFn| f(self.set))
        };
        if let Err(e) = result {
            log::warn!("Failed to free event set: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeDevice, FakeLibrary};

    #[test]
    fn test_supported_event_types() {
        let library = FakeLibrary::new().with_device(FakeDevice::new("A", "GPU-a"));
        let nvml = Nvml::from_source(&library).unwrap();
        let types = nvml
            .device_by_index(0)
            .unwrap()
            .supported_event_types()
            .unwrap();
        assert!(types.contains(EventTypes::XID_CRITICAL_ERROR));
        assert!(types.contains(EventTypes::PSTATE));
    }

    #[test]
    fn test_wait_delivers_then_times_out() {
        let library = FakeLibrary::new().with_device(
            FakeDevice::new("A", "GPU-a")
                .with_event(EventTypes::XID_CRITICAL_ERROR, 79)
                .with_event(EventTypes::CLOCK, 0),
        );
        let nvml = Nvml::from_source(&library).unwrap();
        let device = nvml.device_by_index(0).unwrap();
        let set = EventSet::new(&nvml).unwrap();
        set.register(&device, EventTypes::XID_CRITICAL_ERROR).unwrap();

        let event = set.wait(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(event.event_types, EventTypes::XID_CRITICAL_ERROR);
        assert_eq!(event.data, 79);
        assert_eq!(event.device_index, Some(0));

        // Clock events were not registered
        assert!(set.wait(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn test_event_set_freed_on_drop() {
        let library = FakeLibrary::new().with_device(FakeDevice::new("A", "GPU-a"));
        let nvml = Nvml::from_source(&library).unwrap();
        {
            let _set = EventSet::new(&nvml).unwrap();
            assert_eq!(library.live_event_sets(), 1);
        }
        assert_eq!(library.live_event_sets(), 0);
    }
}
