//! Tracing setup
//!
//! Two outputs share one `EnvFilter`:
//! - stderr, human readable, warnings only unless verbose
//! - `<config_dir>/logs/sysagent.log`, JSON lines, rolled daily
//!
//! `RUST_LOG` overrides the computed filter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::Config;

/// Base name of the rolling log file
pub const LOG_FILE: &str = "sysagent.log";

/// What `init_logging` should install
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Directory for the JSON log file; `None` disables it
    pub logs_dir: Option<PathBuf>,
    /// Echo info-level events to stderr
    pub verbose: bool,
    /// Debug-level filter
    pub debug: bool,
}

impl LoggingOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            logs_dir: Some(config.logs_dir()),
            verbose: config.verbose,
            debug: config.debug,
        }
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> &'static str {
        if self.debug {
            "sysagent=debug"
        } else {
            "sysagent=info"
        }
    }

    fn stderr_level(&self) -> LevelFilter {
        match (self.debug, self.verbose) {
            (true, _) => LevelFilter::DEBUG,
            (false, true) => LevelFilter::INFO,
            (false, false) => LevelFilter::WARN,
        }
    }
}

/// Keeps the background file writer alive; drop it last
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber
pub fn init_logging(options: &LoggingOptions) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(options.stderr_level());

    let (file_layer, guard) = match &options.logs_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("[Logging] Initialized ({})", options.default_directive());
    Ok(LogGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::new().with_config_dir(dir.path());
        config.debug = true;

        let options = LoggingOptions::from_config(&config);
        assert_eq!(options.logs_dir, Some(dir.path().join("logs")));
        assert_eq!(options.default_directive(), "sysagent=debug");
        assert_eq!(options.stderr_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_stderr_quiet_by_default() {
        let options = LoggingOptions::default();
        assert_eq!(options.default_directive(), "sysagent=info");
        assert_eq!(options.stderr_level(), LevelFilter::WARN);

        let verbose = LoggingOptions {
            verbose: true,
            ..LoggingOptions::default()
        };
        assert_eq!(verbose.stderr_level(), LevelFilter::INFO);
    }
}
