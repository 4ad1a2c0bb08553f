//! List command implementation
//!
//! Lists all detected NVIDIA GPUs.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, GpuList, GpuListEntry};
use crate::commands::optional;
use crate::config::Config;
use crate::dl::SymbolSource;
use crate::error::Result;
use crate::nvml::Nvml;

/// Execute the list command
pub fn run_list(config: &Config, format: OutputFormat) -> Result<()> {
    let nvml = Nvml::init_with(&config.loader())?;
    let gpu_list = gpu_list(&nvml)?;
    print_output(&gpu_list, format)?;
    nvml.close()?;
    Ok(())
}

/// Driver version plus one entry per GPU
pub fn gpu_list<S: SymbolSource>(nvml: &Nvml<S>) -> Result<GpuList> {
    let driver_version = nvml.driver_version()?;
    let nvml_version = optional("NVML version", nvml.nvml_version())?;

    let devices = nvml.devices()?;
    let mut gpus = Vec::with_capacity(devices.len());

    for (index, device) in (0u32..).zip(&devices) {
        gpus.push(GpuListEntry {
            index,
            name: device.name()?,
            uuid: device.uuid()?,
            bus_id: optional("PCI info", device.pci_info())?.map(|pci| pci.bus_id),
        });
    }

    Ok(GpuList {
        gpus,
        driver_version,
        nvml_version,
    })
}
