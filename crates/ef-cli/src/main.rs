use clap::{Parser, Subcommand};
use colored::Colorize;
use ef_cli::commands::{init::execute_init, mocks::execute_mocks, scan::execute_scan, scan::ScanArgs};
use ef_cli::config::DEFAULT_CONFIG_FILE;
use ef_cli::MockOutputFormat;
use ef_core::LogFormat;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "e2e-forge")]
#[command(about = "Test-selector coverage, API inventory and mock fixtures for frontend projects")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG is used when absent
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text", value_parser = parse_log_format)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented configuration file
    Init {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        path: String,
    },
    /// Audit selectors and extract API calls, optionally patching sources
    Scan {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,
        #[command(flatten)]
        args: ScanArgs,
    },
    /// Synthesize mock fixtures from the endpoint inventory
    Mocks {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,
        #[arg(long, value_enum)]
        format: Option<MockOutputFormat>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = ef_core::init_from_args(cli.log_level, cli.log_file, cli.log_format, cli.verbose) {
        eprintln!("{} failed to initialize logging: {:#}", "error:".red().bold(), e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Init { path } => execute_init(&path).map(|_| ExitCode::SUCCESS),
        Commands::Scan { config, args } => execute_scan(&config, &args).map(|summary| {
            if summary.threshold_exceeded {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }),
        Commands::Mocks { config, format, output } => {
            execute_mocks(&config, format, output).map(|_| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
