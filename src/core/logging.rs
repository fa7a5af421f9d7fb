use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::shared::paths::{ensure_dir, get_log_dir};

const LOG_FILE_PREFIX: &str = "session.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create logs directory {path:?}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to set global tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// No console output; the log file still records lifecycle messages.
    Quiet,
    #[default]
    Normal,
    /// Adds per-sample debug messages.
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Verbosity::Quiet,
            (true, false) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }

    fn default_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet | Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub verbosity: Verbosity,
    /// Defaults to [`get_log_dir`].
    pub log_dir: Option<PathBuf>,
}

/// Keeps the non-blocking log writers alive. Drop flushes pending lines.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()))
}

pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuards, LoggingError> {
    let log_dir = config.log_dir.clone().unwrap_or_else(get_log_dir);
    ensure_dir(&log_dir).map_err(|source| LoggingError::LogDir {
        path: log_dir.clone(),
        source,
    })?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true);

    let console_layer = (config.verbosity != Verbosity::Quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config.verbosity))
        .with(file_layer)
        .with(console_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(target: "session", "Logging initialized at {:?}", log_dir);

    Ok(LoggingGuards {
        _guards: vec![file_guard],
    })
}
