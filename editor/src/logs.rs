//! Logging setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::EditorError;

/// Log level, written in lowercase in settings files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Directive understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "warning" {
            return Ok(LogLevel::Warn);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| EditorError::ConfigError(format!("invalid log level: {}", s)))
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default level; `RUST_LOG` takes precedence
    pub log_level: LogLevel,

    /// Write logs to stdout
    pub stdout: bool,

    /// One JSON object per line instead of plain text
    pub json_format: bool,

    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stdout: true,
            json_format: false,
            with_target: true,
        }
    }
}

/// Install the global subscriber
///
/// Fails if one is already installed.
pub fn init_logging(options: LogOptions) -> Result<(), EditorError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.as_str()));

    let json = (options.stdout && options.json_format)
        .then(|| fmt::layer().json().with_target(options.with_target));
    let plain = (options.stdout && !options.json_format)
        .then(|| fmt::layer().with_target(options.with_target));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|e| EditorError::ConfigError(format!("logging already initialized: {}", e)))
}
