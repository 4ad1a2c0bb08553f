//! Info command implementation
//!
//! Shows detailed GPU information.

use crate::cli::args::{InfoArgs, OutputFormat};
use crate::cli::output::{print_output, DeviceReport, PcieLink};
use crate::commands::{optional, select_devices};
use crate::config::Config;
use crate::dl::SymbolSource;
use crate::domain::ClockType;
use crate::error::Result;
use crate::nvml::{Device, Nvml};

/// Execute the info command
pub fn run_info(args: &InfoArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let nvml = Nvml::init_with(&config.loader())?;

    for (index, device) in select_devices(&nvml, args.gpu)? {
        let report = device_report(index, &device)?;
        print_output(&report, format)?;
    }

    nvml.close()?;
    Ok(())
}

/// Query everything the device answers
///
/// Only name and UUID are required; anything else the GPU or driver
/// cannot report is left out.
pub fn device_report<S: SymbolSource>(index: u32, device: &Device<'_, S>) -> Result<DeviceReport> {
    let mut report = DeviceReport {
        index,
        name: device.name()?,
        uuid: device.uuid()?,
        ..Default::default()
    };

    report.serial = optional("serial", device.serial())?;
    report.brand = optional("brand", device.brand())?.map(|b| b.to_string());
    report.vbios_version = optional("VBIOS version", device.vbios_version())?;
    report.pci = optional("PCI info", device.pci_info())?;
    report.pcie_link = pcie_link(device)?;

    report.memory = optional("memory info", device.memory_info())?;
    report.bar1_memory = optional("BAR1 memory info", device.bar1_memory_info())?;
    report.utilization = optional("utilization", device.utilization())?;
    report.temperature_c = optional("temperature", device.temperature())?;
    report.fan_speed_percent = optional("fan speed", device.fan_speed())?;
    report.power_usage_mw = optional("power usage", device.power_usage())?;
    report.power_limit_mw = optional("power limit", device.enforced_power_limit())?;
    report.performance_state =
        optional("performance state", device.performance_state())?.map(|p| p.to_string());

    for clock in ClockType::ALL {
        if let Some(mhz) = optional(clock.label(), device.clock_info(clock))? {
            report.clocks_mhz.push((clock.label().to_string(), mhz));
        }
    }

    report.throttle_reasons = optional("throttle reasons", device.current_throttle_reasons())?
        .map(|reasons| reasons.active_reasons());
    report.persistence_mode = optional("persistence mode", device.persistence_mode())?;
    report.compute_mode = optional("compute mode", device.compute_mode())?.map(|m| format!("{:?}", m));
    report.ecc_mode = optional("ECC mode", device.ecc_mode())?;
    report.cpu_affinity = optional("CPU affinity", device.cpu_affinity())?;

    let compute = optional("compute processes", device.running_compute_processes())?;
    let graphics = optional("graphics processes", device.running_graphics_processes())?;
    report.processes = match (compute, graphics) {
        (None, None) => None,
        (compute, graphics) => Some(
            compute
                .into_iter()
                .flatten()
                .chain(graphics.into_iter().flatten())
                .collect(),
        ),
    };

    Ok(report)
}

fn pcie_link<S: SymbolSource>(device: &Device<'_, S>) -> Result<Option<PcieLink>> {
    let link = device
        .current_pcie_link_generation()
        .and_then(|current_generation| {
            Ok(PcieLink {
                current_generation,
                max_generation: device.max_pcie_link_generation()?,
                current_width: device.current_pcie_link_width()?,
                max_width: device.max_pcie_link_width()?,
            })
        });
    optional("PCIe link", link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeDevice, FakeLibrary};

    #[test]
    fn test_report_contains_supported_fields() {
        let library = FakeLibrary::new().with_device(
            FakeDevice::new("Tesla T4", "GPU-a")
                .with_bus_id("00000000:3B:00.0")
                .with_memory(16 << 30, 4 << 30)
                .with_process(4242, 1 << 30)
                .with_throttle_reasons(0x4)
                .with_cpus(&[0, 1, 2, 3]),
        );
        let nvml = Nvml::from_source(&library).unwrap();
        let device = nvml.device_by_index(0).unwrap();

        let report = device_report(0, &device).unwrap();
        assert_eq!(report.name, "Tesla T4");
        assert_eq!(report.uuid, "GPU-a");
        assert_eq!(report.pci.unwrap().bus_id, "00000000:3B:00.0");
        assert_eq!(report.memory.unwrap().total, 16 << 30);
        assert_eq!(report.throttle_reasons, Some(vec!["Power Cap"]));
        assert_eq!(report.cpu_affinity, Some(vec![0, 1, 2, 3]));

        let processes = report.processes.unwrap();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].pid, 4242);
    }

    #[test]
    fn test_report_omits_unsupported_fields() {
        let library = FakeLibrary::new().with_device(FakeDevice::new("A", "GPU-a"));
        let nvml = Nvml::from_source(&library).unwrap();
        let device = nvml.device_by_index(0).unwrap();

        let report = device_report(0, &device).unwrap();
        // NOT_SUPPORTED from the driver
        assert_eq!(report.fan_speed_percent, None);
        // Not exported at all
        assert_eq!(report.temperature_c, None);
        assert!(report.pcie_link.is_none());
        assert!(report.clocks_mhz.is_empty());
    }

    #[test]
    fn test_report_requires_name() {
        let library = FakeLibrary::new()
            .with_device(FakeDevice::new("A", "GPU-a"))
            .without_export("nvmlDeviceGetName");
        let nvml = Nvml::from_source(&library).unwrap();
        let device = nvml.device_by_index(0).unwrap();

        assert!(device_report(0, &device).is_err());
    }
}
