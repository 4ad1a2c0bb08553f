//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::dl::Group;
use crate::domain::{
    Bar1MemoryInfo, EccMode, EventData, MemoryInfo, PciInfo, ProcessInfo, Utilization,
};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    handle.flush()
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// Resolution outcome for one entry point
#[derive(Debug, Clone, Serialize)]
pub struct SymbolEntry {
    pub name: &'static str,
    pub group: Group,
    /// The export that resolved, if any
    pub resolved: Option<&'static str>,
}

impl TableDisplay for SymbolEntry {
    fn to_table(&self) -> String {
        match self.resolved {
            Some(export) if export != self.name => {
                format!("  ✓ {:<48} (via {})", self.name, export)
            }
            Some(_) => format!("  ✓ {}", self.name),
            None => format!("  ✗ {}", self.name),
        }
    }
}

/// Export report for a loaded library
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub library: String,
    pub resolved: usize,
    pub total: usize,
    pub entries: Vec<SymbolEntry>,
}

impl TableDisplay for SymbolReport {
    fn to_table(&self) -> String {
        let mut output = format!("Library: {}\n", self.library);
        output.push_str(&format!("Resolved: {}/{}\n", self.resolved, self.total));

        let mut current = None;
        for entry in &self.entries {
            if current != Some(entry.group) {
                output.push_str(&format!("\n[{}]\n", entry.group));
                current = Some(entry.group);
            }
            output.push_str(&entry.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        let missing: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.resolved.is_none())
            .map(|e| e.name)
            .collect();
        if missing.is_empty() {
            format!("{}: {}/{} resolved", self.library, self.resolved, self.total)
        } else {
            format!(
                "{}: {}/{} resolved, missing {}",
                self.library,
                self.resolved,
                self.total,
                missing.join(",")
            )
        }
    }
}

/// GPU list entry for display
#[derive(Debug, Clone, Serialize)]
pub struct GpuListEntry {
    pub index: u32,
    pub name: String,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_id: Option<String>,
}

impl TableDisplay for GpuListEntry {
    fn to_table(&self) -> String {
        match &self.bus_id {
            Some(bus_id) => format!(
                "[{}] {} (UUID: {}, PCI: {})",
                self.index, self.name, self.uuid, bus_id
            ),
            None => format!("[{}] {} (UUID: {})", self.index, self.name, self.uuid),
        }
    }

    fn to_compact(&self) -> String {
        format!("{}:{}", self.index, self.name)
    }
}

/// GPU list for display
#[derive(Debug, Clone, Serialize)]
pub struct GpuList {
    pub gpus: Vec<GpuListEntry>,
    pub driver_version: String,
    pub nvml_version: Option<String>,
}

impl TableDisplay for GpuList {
    fn to_table(&self) -> String {
        let mut output = format!("Driver Version: {}\n", self.driver_version);
        if let Some(version) = &self.nvml_version {
            output.push_str(&format!("NVML Version: {}\n", version));
        }
        output.push_str(&format!("GPUs Found: {}\n\n", self.gpus.len()));

        for gpu in &self.gpus {
            output.push_str(&gpu.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.gpus
            .iter()
            .map(|g| g.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Detailed per-device report
///
/// Every query the device or driver does not support is left as `None` and
/// omitted from the output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceReport {
    pub index: u32,
    pub name: String,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbios_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pci: Option<PciInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcie_link: Option<PcieLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar1_memory: Option<Bar1MemoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization: Option<Utilization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_speed_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_usage_mw: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_limit_mw: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_state: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clocks_mhz: Vec<(String, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle_reasons: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecc_mode: Option<EccMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_affinity: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessInfo>>,
}

/// PCIe link generation and width
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PcieLink {
    pub current_generation: u32,
    pub max_generation: u32,
    pub current_width: u32,
    pub max_width: u32,
}

impl TableDisplay for DeviceReport {
    fn to_table(&self) -> String {
        let mut output = format!("[{}] {}\n", self.index, self.name);
        output.push_str(&format!("  UUID: {}\n", self.uuid));

        if let Some(serial) = &self.serial {
            output.push_str(&format!("  Serial: {}\n", serial));
        }
        if let Some(brand) = &self.brand {
            output.push_str(&format!("  Brand: {}\n", brand));
        }
        if let Some(vbios) = &self.vbios_version {
            output.push_str(&format!("  VBIOS: {}\n", vbios));
        }
        if let Some(pci) = &self.pci {
            output.push_str(&format!(
                "  PCI: {} (device {:#010x})\n",
                pci.bus_id, pci.pci_device_id
            ));
        }
        if let Some(link) = &self.pcie_link {
            output.push_str(&format!(
                "  PCIe Link: Gen{} x{} (Max: Gen{} x{})\n",
                link.current_generation, link.current_width, link.max_generation, link.max_width
            ));
        }
        if let Some(memory) = &self.memory {
            output.push_str(&format!(
                "  Memory: {} / {} MB ({}%)\n",
                memory.used_mb(),
                memory.total_mb(),
                memory.usage_percent()
            ));
        }
        if let Some(bar1) = &self.bar1_memory {
            output.push_str(&format!(
                "  BAR1: {} / {} MB\n",
                bar1.used / (1024 * 1024),
                bar1.total / (1024 * 1024)
            ));
        }
        if let Some(util) = &self.utilization {
            output.push_str(&format!(
                "  Utilization: GPU {}%, Memory {}%\n",
                util.gpu, util.memory
            ));
        }
        if let Some(temp) = self.temperature_c {
            output.push_str(&format!("  Temperature: {}°C\n", temp));
        }
        if let Some(fan) = self.fan_speed_percent {
            output.push_str(&format!("  Fan: {}%\n", fan));
        }
        match (self.power_usage_mw, self.power_limit_mw) {
            (Some(usage), Some(limit)) => output.push_str(&format!(
                "  Power: {:.1}W / {:.1}W\n",
                usage as f64 / 1000.0,
                limit as f64 / 1000.0
            )),
            (Some(usage), None) => {
                output.push_str(&format!("  Power: {:.1}W\n", usage as f64 / 1000.0))
            }
            (None, Some(limit)) => {
                output.push_str(&format!("  Power Limit: {:.1}W\n", limit as f64 / 1000.0))
            }
            (None, None) => {}
        }
        if let Some(pstate) = &self.performance_state {
            output.push_str(&format!("  Performance State: {}\n", pstate));
        }
        if !self.clocks_mhz.is_empty() {
            let clocks: Vec<_> = self
                .clocks_mhz
                .iter()
                .map(|(label, mhz)| format!("{} {} MHz", label, mhz))
                .collect();
            output.push_str(&format!("  Clocks: {}\n", clocks.join(", ")));
        }
        if let Some(reasons) = &self.throttle_reasons {
            if reasons.is_empty() {
                output.push_str("  Throttling: None\n");
            } else {
                output.push_str(&format!("  Throttling: {}\n", reasons.join(", ")));
            }
        }
        if let Some(enabled) = self.persistence_mode {
            output.push_str(&format!("  Persistence Mode: {}\n", on_off(enabled)));
        }
        if let Some(mode) = &self.compute_mode {
            output.push_str(&format!("  Compute Mode: {}\n", mode));
        }
        if let Some(ecc) = &self.ecc_mode {
            if ecc.has_pending_change() {
                output.push_str(&format!(
                    "  ECC: {} (pending {})\n",
                    on_off(ecc.current),
                    on_off(ecc.pending)
                ));
            } else {
                output.push_str(&format!("  ECC: {}\n", on_off(ecc.current)));
            }
        }
        if let Some(cpus) = &self.cpu_affinity {
            output.push_str(&format!("  CPU Affinity: {}\n", format_cpu_list(cpus)));
        }
        if let Some(processes) = &self.processes {
            if processes.is_empty() {
                output.push_str("  Processes: None\n");
            } else {
                output.push_str("  Processes:\n");
                for process in processes {
                    output.push_str(&format!("    {}\n", process));
                }
            }
        }

        output
    }

    fn to_compact(&self) -> String {
        let mut parts = vec![format!("{}:{}", self.index, self.name)];
        if let Some(temp) = self.temperature_c {
            parts.push(format!("{}C", temp));
        }
        if let Some(util) = &self.utilization {
            parts.push(format!("{}%", util.gpu));
        }
        if let Some(memory) = &self.memory {
            parts.push(format!("{}/{}MB", memory.used_mb(), memory.total_mb()));
        }
        parts.join(" ")
    }
}

/// A delivered event for display
#[derive(Debug, Clone, Serialize)]
pub struct EventLine {
    #[serde(flatten)]
    pub event: EventData,
    pub event_names: Vec<&'static str>,
}

impl From<EventData> for EventLine {
    fn from(event: EventData) -> Self {
        Self {
            event_names: event.event_types.names(),
            event,
        }
    }
}

impl TableDisplay for EventLine {
    fn to_table(&self) -> String {
        let device = match self.event.device_index {
            Some(index) => format!("[{}]", index),
            None => "[?]".to_string(),
        };
        format!("{} {} data={}", device, self.event.event_types, self.event.data)
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Collapse sorted CPU indices into ranges, e.g. `0-3,8`
fn format_cpu_list(cpus: &[u32]) -> String {
    let mut ranges: Vec<String> = Vec::new();
    let mut iter = cpus.iter().copied().peekable();

    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            ranges.push(start.to_string());
        } else {
            ranges.push(format!("{}-{}", start, end));
        }
    }

    ranges.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventTypes;

    #[test]
    fn test_gpu_list_entry_table() {
        let entry = GpuListEntry {
            index: 0,
            name: "Test GPU".to_string(),
            uuid: "GPU-123".to_string(),
            bus_id: Some("00000000:01:00.0".to_string()),
        };

        let output = entry.to_table();
        assert!(output.contains("Test GPU"));
        assert!(output.contains("GPU-123"));
        assert!(output.contains("00000000:01:00.0"));
        assert_eq!(entry.to_compact(), "0:Test GPU");
    }

    #[test]
    fn test_symbol_report_marks_aliases_and_missing() {
        let report = SymbolReport {
            library: "libnvidia-ml.so.1".to_string(),
            resolved: 1,
            total: 2,
            entries: vec![
                SymbolEntry {
                    name: "nvmlInit",
                    group: Group::Initialization,
                    resolved: Some("nvmlInit_v2"),
                },
                SymbolEntry {
                    name: "nvmlShutdown",
                    group: Group::Initialization,
                    resolved: None,
                },
            ],
        };

        let table = report.to_table();
        assert!(table.contains("Resolved: 1/2"));
        assert!(table.contains("(via nvmlInit_v2)"));
        assert!(table.contains("✗ nvmlShutdown"));
        assert_eq!(table.matches("[initialization]").count(), 1);
        assert!(report.to_compact().ends_with("missing nvmlShutdown"));
    }

    #[test]
    fn test_device_report_omits_unsupported() {
        let report = DeviceReport {
            index: 0,
            name: "Test GPU".to_string(),
            uuid: "GPU-123".to_string(),
            temperature_c: Some(45),
            ..Default::default()
        };

        let table = report.to_table();
        assert!(table.contains("Temperature: 45°C"));
        assert!(!table.contains("Fan"));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("fan_speed_percent").is_none());
        assert_eq!(json["temperature_c"], 45);
    }

    #[test]
    fn test_event_line() {
        let line = EventLine::from(EventData {
            device_index: Some(1),
            event_types: EventTypes::XID_CRITICAL_ERROR,
            data: 79,
        });
        assert_eq!(line.to_table(), "[1] xid data=79");
        assert_eq!(line.event_names, ["xid"]);
    }

    #[test]
    fn test_format_cpu_list() {
        assert_eq!(format_cpu_list(&[0, 1, 2, 3, 8, 10, 11]), "0-3,8,10-11");
        assert_eq!(format_cpu_list(&[]), "");
    }
}
