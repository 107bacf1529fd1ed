//! Logging setup for the lifecycle controller
//!
//! Library code only emits `tracing` events. Binaries call [`setup_logging`] once
//! at startup to install a `tracing-subscriber` registry with an `EnvFilter`.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::Error;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Whether to enable colored output
    pub enable_colors: bool,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to include file/line information
    pub include_file_line: bool,
    /// Custom environment filter, overrides `level` when set
    pub custom_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            enable_colors: true,
            include_thread_ids: false,
            include_file_line: false,
            custom_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from `LIFECYCLE_LOG_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = env::var("LIFECYCLE_LOG_LEVEL") {
            config.level = level.parse().unwrap_or(LogLevel::Info);
        }

        if let Ok(format) = env::var("LIFECYCLE_LOG_FORMAT") {
            config.format = format.parse().unwrap_or(LogFormat::Compact);
        }

        if let Ok(colors) = env::var("LIFECYCLE_LOG_COLORS") {
            config.enable_colors = colors.parse().unwrap_or(true);
        }

        if let Ok(thread_ids) = env::var("LIFECYCLE_LOG_THREAD_IDS") {
            config.include_thread_ids = thread_ids.parse().unwrap_or(false);
        }

        if let Ok(file_line) = env::var("LIFECYCLE_LOG_FILE_LINE") {
            config.include_file_line = file_line.parse().unwrap_or(false);
        }

        if let Ok(filter) = env::var("LIFECYCLE_LOG_FILTER") {
            config.custom_filter = Some(filter);
        }

        config
    }

    /// Build the env filter for this configuration
    pub fn env_filter(&self) -> Result<EnvFilter, Error> {
        match &self.custom_filter {
            Some(filter) => EnvFilter::try_new(filter)
                .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", filter, e))),
            None => Ok(EnvFilter::new(Level::from(self.level).as_str())),
        }
    }
}

/// Supported logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Supported log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Compact human-readable format
    Compact,
    /// Pretty human-readable format with indentation
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn setup_logging(config: &LoggingConfig) -> Result<(), Error> {
    let env_filter = config.env_filter()?;

    let result = match config.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(config.include_thread_ids)
                    .with_file(config.include_file_line)
                    .with_line_number(config.include_file_line)
                    .with_ansi(config.enable_colors),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(config.include_thread_ids)
                    .with_file(config.include_file_line)
                    .with_line_number(config.include_file_line)
                    .with_ansi(config.enable_colors),
            )
            .try_init(),
    };

    result.map_err(|e| Error::Other(format!("Failed to install tracing subscriber: {}", e)))
}
