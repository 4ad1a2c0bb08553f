//! nvml-dl - runtime-resolved NVML probe
//!
//! Reports which NVML entry points the installed driver exports and
//! queries GPUs through them.

use clap::Parser;
use nvml_dl::cli::args::{generate_completions, Cli, Commands};
use nvml_dl::commands::{run_info, run_list, run_symbols, run_watch};
use nvml_dl::config::{Config, ConfigBuilder};
use nvml_dl::error::{AppError, ConfigError, NvmlError};

fn main() {
    let cli = Cli::parse();

    // Config is read before logging starts so its verbose flag counts too
    let config = load_config(&cli);
    let verbose = cli.verbose
        || config
            .as_ref()
            .map(|c| c.general.verbose)
            .unwrap_or(false);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "warn" }),
    )
    .format_timestamp(None)
    .init();

    let result = config.map_err(AppError::from).and_then(|config| run(&cli, &config));

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let timeout_ms = match &cli.command {
        Commands::Watch(args) => args.timeout_ms,
        _ => None,
    };

    ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .with_library(cli.library.clone())
        .with_event_timeout(timeout_ms)
        .build()
}

fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    match &cli.command {
        Commands::Symbols(args) => run_symbols(args, config, cli.format),

        Commands::List => run_list(config, cli.format),

        Commands::Info(args) => run_info(args, config, cli.format),

        Commands::Watch(args) => run_watch(args, config, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Nvml(NvmlError::LibraryNotFound { .. }) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      Use --library or NVML_DL_LIBRARY to point at libnvidia-ml.");
        }
        AppError::Nvml(NvmlError::NoPermission { .. }) => {
            eprintln!();
            eprintln!("Hint: Try running with sudo or as root.");
        }
        AppError::Nvml(NvmlError::Symbol(_)) => {
            eprintln!();
            eprintln!("Hint: The installed driver does not export this entry point.");
            eprintln!("      Run 'nvml-dl symbols --missing' to see what is unavailable.");
        }
        AppError::NoGpusFound => {
            eprintln!();
            eprintln!("Hint: Make sure you have an NVIDIA GPU installed.");
            eprintln!("      Check 'nvidia-smi' for GPU detection.");
        }
        _ => {}
    }
}
