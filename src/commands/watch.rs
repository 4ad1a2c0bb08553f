//! Watch command implementation
//!
//! Registers the selected GPUs for every event they support and prints
//! events as they arrive.

use std::time::Duration;

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::cli::output::{print_output, EventLine};
use crate::commands::{optional, select_devices};
use crate::config::Config;
use crate::dl::SymbolSource;
use crate::domain::{EventData, EventTypes};
use crate::error::{AppError, Result};
use crate::nvml::{Device, EventSet, Nvml};

/// Execute the watch command
pub fn run_watch(args: &WatchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let nvml = Nvml::init_with(&config.loader())?;

    {
        let devices = select_devices(&nvml, args.gpu)?;
        let set = EventSet::new(&nvml)?;
        register_supported(&set, &devices)?;

        watch(&set, config.events.timeout(), args.count, |event| {
            print_output(&EventLine::from(event), format)?;
            Ok(())
        })?;
    }

    nvml.close()?;
    Ok(())
}

/// Register each device for all of its supported event types
///
/// Devices without event support are skipped. Fails with
/// [`AppError::NoEventSources`] when no device could be registered.
pub fn register_supported<'nvml, S: SymbolSource>(
    set: &EventSet<'nvml, S>,
    devices: &[(u32, Device<'nvml, S>)],
) -> Result<usize> {
    let mut registered = 0;

    for (index, device) in devices {
        let types = optional("supported event types", device.supported_event_types())?
            .unwrap_or(EventTypes::NONE);
        if types.is_empty() {
            log::info!("GPU {} does not support events", index);
            continue;
        }

        set.register(device, types)?;
        log::debug!("GPU {}: watching {}", index, types);
        registered += 1;
    }

    if registered == 0 {
        return Err(AppError::NoEventSources);
    }
    Ok(registered)
}

/// Wait for events until `count` have been handled, or forever
pub fn watch<S, F>(
    set: &EventSet<'_, S>,
    timeout: Duration,
    count: Option<usize>,
    mut on_event: F,
) -> Result<usize>
where
    S: SymbolSource,
    F: FnMut(EventData) -> Result<()>,
{
    let mut seen = 0;

    while count.map_or(true, |limit| seen < limit) {
        match set.wait(timeout)? {
            Some(event) => {
                on_event(event)?;
                seen += 1;
            }
            None => log::trace!("No event within {:?}", timeout),
        }
    }

    Ok(seen)
}
