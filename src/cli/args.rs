//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::config::file::CONFIG_ENV;
use crate::dl::Group;

/// Runtime-resolved NVML probe
///
/// Loads the NVML library at runtime, reports which entry points the
/// installed driver exports, and queries GPUs through them.
#[derive(Parser, Debug)]
#[command(name = "nvml-dl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<String>,

    /// Path to the NVML library, tried before any other
    #[arg(short, long, global = true)]
    pub library: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report which NVML entry points the library exports
    Symbols(SymbolsArgs),

    /// List all detected GPUs
    List,

    /// Show GPU information
    Info(InfoArgs),

    /// Print GPU events as they arrive
    Watch(WatchArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the symbols command
#[derive(Parser, Debug)]
pub struct SymbolsArgs {
    /// Only report entry points in this group
    #[arg(short, long, value_enum)]
    pub group: Option<GroupArg>,

    /// Only report entry points the library does not export
    #[arg(short, long)]
    pub missing: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Target GPU by index (0-based); all GPUs when omitted
    #[arg(long)]
    pub gpu: Option<u32>,
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Target GPU by index (0-based); all GPUs when omitted
    #[arg(long)]
    pub gpu: Option<u32>,

    /// How long each wait blocks, in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Exit after this many events
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

/// Entry point group argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupArg {
    Initialization,
    System,
    DeviceQuery,
    Unit,
    DeviceCommand,
    Event,
}

impl From<GroupArg> for Group {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::Initialization => Group::Initialization,
            GroupArg::System => Group::System,
            GroupArg::DeviceQuery => Group::DeviceQuery,
            GroupArg::Unit => Group::Unit,
            GroupArg::DeviceCommand => Group::DeviceCommand,
            GroupArg::Event => Group::Event,
        }
    }
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_list() {
        let args = Cli::try_parse_from(["nvml-dl", "list"]).unwrap();
        assert!(matches!(args.command, Commands::List));
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let args = Cli::try_parse_from([
            "nvml-dl",
            "-v",
            "--format",
            "json",
            "--library",
            "/opt/libnvidia-ml.so.1",
            "list",
        ])
        .unwrap();
        assert!(args.verbose);
        assert!(matches!(args.format, OutputFormat::Json));
        assert_eq!(args.library.as_deref(), Some("/opt/libnvidia-ml.so.1"));
    }

    #[test]
    fn test_config_flag_reads_config_env() {
        let command = Cli::command();
        let config = command
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .unwrap();
        assert_eq!(config.get_env(), Some(std::ffi::OsStr::new(CONFIG_ENV)));
    }

    #[test]
    fn test_cli_parse_symbols() {
        let args =
            Cli::try_parse_from(["nvml-dl", "symbols", "--group", "device-query", "--missing"])
                .unwrap();
        if let Commands::Symbols(symbols) = args.command {
            assert_eq!(symbols.group, Some(GroupArg::DeviceQuery));
            assert!(symbols.missing);
            assert_eq!(Group::from(GroupArg::DeviceQuery), Group::DeviceQuery);
        } else {
            panic!("Expected Symbols command");
        }
    }

    #[test]
    fn test_cli_parse_info_gpu() {
        let args = Cli::try_parse_from(["nvml-dl", "info", "--gpu", "1"]).unwrap();
        if let Commands::Info(info) = args.command {
            assert_eq!(info.gpu, Some(1));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_cli_parse_watch() {
        let args =
            Cli::try_parse_from(["nvml-dl", "watch", "--timeout-ms", "200", "-n", "3"]).unwrap();
        if let Commands::Watch(watch) = args.command {
            assert_eq!(watch.timeout_ms, Some(200));
            assert_eq!(watch.count, Some(3));
            assert_eq!(watch.gpu, None);
        } else {
            panic!("Expected Watch command");
        }
    }

    #[test]
    fn test_cli_watch_timeout_validation() {
        let result = Cli::try_parse_from(["nvml-dl", "watch", "--timeout-ms", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
