use crate::logging::formatter::LogFormat;
use std::path::PathBuf;

/// Environment variable naming a log file when `--log-file` is not given
pub const LOG_FILE_ENV: &str = "EF_LOG_FILE";

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive (`info`, `ef_typescript=debug`)
    pub level: String,
    /// Extra file sink
    pub file: Option<PathBuf>,
    /// Whether events also go to stderr
    pub console: bool,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_sources(None, None, LogFormat::Text, false, |key| std::env::var(key).ok())
    }
}

impl LoggingConfig {
    pub fn new(level: String, file: Option<PathBuf>, console: bool, format: LogFormat) -> Self {
        Self {
            level,
            file,
            console,
            format,
        }
    }

    /// Merges command-line values with the environment.
    ///
    /// Level: `verbose` forces `debug`, then the explicit level, then
    /// `RUST_LOG`, then `info`. File: the explicit path, then [`LOG_FILE_ENV`].
    pub fn from_sources(
        level: Option<String>,
        file: Option<PathBuf>,
        format: LogFormat,
        verbose: bool,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let level = if verbose {
            "debug".to_string()
        } else {
            level
                .or_else(|| env("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string())
        };
        let file = file.or_else(|| env(LOG_FILE_ENV).map(PathBuf::from));
        Self::new(level, file, true, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let env = |key: &str| match key {
            "RUST_LOG" => Some("warn".to_string()),
            LOG_FILE_ENV => Some("/tmp/ef.log".to_string()),
            _ => None,
        };

        let from_env = LoggingConfig::from_sources(None, None, LogFormat::Json, false, env);
        assert_eq!(from_env.level, "warn");
        assert_eq!(from_env.file, Some(PathBuf::from("/tmp/ef.log")));

        let explicit = LoggingConfig::from_sources(
            Some("trace".to_string()),
            Some(PathBuf::from("run.log")),
            LogFormat::Text,
            false,
            env,
        );
        assert_eq!(explicit.level, "trace");
        assert_eq!(explicit.file, Some(PathBuf::from("run.log")));

        let verbose = LoggingConfig::from_sources(Some("error".to_string()), None, LogFormat::Text, true, |_| None);
        assert_eq!(verbose.level, "debug");
        assert_eq!(verbose.file, None);
    }
}
