//! Structured logging using tracing.
//!
//! Provides configurable logging with:
//! - Different log levels for development and production
//! - Console output with human-readable formatting
//! - Optional file output with JSON formatting and rotation

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Error, FileSystemError, Result};

/// Logging configuration options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files; `None` logs to the console only.
    pub log_directory: Option<PathBuf>,
    /// Log file name prefix (e.g., "vidshelf" -> "vidshelf.2024-01-15.log").
    pub log_file_prefix: String,
    /// Maximum log level for console output.
    pub console_level: Level,
    /// Maximum log level for file output.
    pub file_level: Level,
    /// How often to rotate log files.
    pub rotation: LogRotation,
    /// Number of rotated files to keep (0 = keep forever).
    pub max_log_files: usize,
    /// Whether to include ANSI color codes in console output.
    pub console_ansi: bool,
    /// Whether to include file/line info in logs.
    pub include_file_line: bool,
    /// Whether to log span events (enter/exit).
    pub log_span_events: bool,
}

/// Log rotation frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Create a new log file every hour.
    Hourly,
    /// Create a new log file every day.
    Daily,
    /// Never rotate (single log file).
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// Verbose console logging, no files.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_directory: None,
            log_file_prefix: "vidshelf".to_string(),
            console_level: Level::DEBUG,
            file_level: Level::TRACE,
            rotation: LogRotation::Hourly,
            max_log_files: 24,
            console_ansi: true,
            include_file_line: true,
            log_span_events: true,
        }
    }

    /// Quiet console plus daily JSON files in the default log directory.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log_directory: Some(default_log_directory()),
            log_file_prefix: "vidshelf".to_string(),
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            rotation: LogRotation::Daily,
            max_log_files: 7,
            console_ansi: true,
            include_file_line: false,
            log_span_events: false,
        }
    }

    /// Detect configuration based on build type.
    #[must_use]
    pub fn auto() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }

    /// Write log files into `path`.
    #[must_use]
    pub fn with_log_directory(mut self, path: PathBuf) -> Self {
        self.log_directory = Some(path);
        self
    }

    /// Log to the console only.
    #[must_use]
    pub fn without_log_files(mut self) -> Self {
        self.log_directory = None;
        self
    }

    /// Set the console log level.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// Set the file log level.
    #[must_use]
    pub const fn with_file_level(mut self, level: Level) -> Self {
        self.file_level = level;
        self
    }

    /// Set the log rotation frequency.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set how many rotated files to keep; 0 keeps them all.
    #[must_use]
    pub const fn with_max_log_files(mut self, count: usize) -> Self {
        self.max_log_files = count;
        self
    }

    /// Retention limit handed to the file appender, `None` for unlimited.
    #[must_use]
    pub const fn retained_log_files(&self) -> Option<usize> {
        match self.max_log_files {
            0 => None,
            count => Some(count),
        }
    }
}

/// Keeps file logging active. Drop this to flush and close log files.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` overrides the console filter. Keep the returned guard alive for
/// as long as log files should be written.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the file
/// appender cannot be built, or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let span_events = if config.log_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => crate_filter("warn", config.console_level)?,
    };

    let console_layer = fmt::layer()
        .with_ansi(config.console_ansi)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events.clone())
        .with_filter(console_filter);

    let (file_layer, file_guard) = match &config.log_directory {
        Some(directory) => {
            if !directory.exists() {
                std::fs::create_dir_all(directory).map_err(|e| {
                    Error::FileSystem(FileSystemError::CreateDirFailed {
                        path: directory.clone(),
                        reason: e.to_string(),
                    })
                })?;
            }

            let mut builder = RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(&config.log_file_prefix)
                .filename_suffix("log");
            if let Some(count) = config.retained_log_files() {
                builder = builder.max_log_files(count);
            }
            let appender = builder
                .build(directory)
                .map_err(|e| Error::Configuration(format!("Failed to open log file: {e}")))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(span_events)
                .json()
                .with_filter(crate_filter("info", config.file_level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Configuration(format!("Failed to initialize logging: {e}")))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Get the default log directory.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidshelf")
        .join("logs")
}

/// `base` for dependencies, `level` for this crate.
fn crate_filter(base: &str, level: Level) -> Result<EnvFilter> {
    let directives = format!("{base},vidshelf_core={}", level_to_directive(level));
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Configuration(format!("Invalid log filter '{directives}': {e}")))
}

/// Convert a tracing Level to a filter directive string.
const fn level_to_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}
