pub mod config;
pub mod file_writer;
pub mod formatter;

use anyhow::Result;
use config::LoggingConfig;
pub use formatter::LogFormat;
use std::path::PathBuf;

pub use config::LOG_FILE_ENV;

/// Initialize logging system with the given configuration
///
/// Console output goes to stderr so that reports written to stdout stay clean.
pub fn init(config: LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.format == LogFormat::Json;

    let console = config.console.then(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(false)
            .with_thread_names(false);
        if json {
            layer.json().boxed()
        } else {
            layer.with_ansi(true).boxed()
        }
    });

    let file = config.file.as_ref().map(|log_file| {
        let layer = fmt::layer()
            .with_writer(file_writer::FileWriter::new(log_file.clone()))
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(false)
            .with_timer(fmt::time::ChronoUtc::rfc_3339());
        if json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    });

    Registry::default()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}

/// Initialize logging with default configuration
pub fn init_default() -> Result<()> {
    init(LoggingConfig::default())
}

/// Initialize logging from environment variables and CLI arguments
pub fn init_from_args(
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    format: LogFormat,
    verbose: bool,
) -> Result<()> {
    init(LoggingConfig::from_sources(
        log_level,
        log_file,
        format,
        verbose,
        |key| std::env::var(key).ok(),
    ))
}
