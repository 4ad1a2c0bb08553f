//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod info;
pub mod list;
pub mod symbols;
pub mod watch;

pub use info::run_info;
pub use list::run_list;
pub use symbols::run_symbols;
pub use watch::run_watch;

use crate::dl::SymbolSource;
use crate::error::{AppError, NvmlError, Result};
use crate::nvml::{Device, Nvml};

/// Devices a command targets, paired with their index
///
/// `gpu` picks a single device; `None` selects every device.
pub(crate) fn select_devices<S: SymbolSource>(
    nvml: &Nvml<S>,
    gpu: Option<u32>,
) -> Result<Vec<(u32, Device<'_, S>)>> {
    let devices = match gpu {
        Some(index) => match nvml.device_by_index(index) {
            Ok(device) => vec![(index, device)],
            Err(NvmlError::InvalidArgument { .. }) | Err(NvmlError::NotFound { .. }) => {
                return Err(AppError::GpuNotFound(index.to_string()))
            }
            Err(e) => return Err(e.into()),
        },
        None => (0u32..).zip(nvml.devices()?).collect(),
    };

    if devices.is_empty() {
        return Err(AppError::NoGpusFound);
    }
    Ok(devices)
}

/// Turn "this GPU or driver cannot answer" into `None`
pub(crate) fn optional<T>(field: &str, result: std::result::Result<T, NvmlError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_supported() || matches!(e, NvmlError::NoPermission { .. }) => {
            log::debug!("Skipping {}: {}", field, e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
