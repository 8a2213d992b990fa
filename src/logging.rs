//! Structured logging setup, adapted from the teacher's `logging::LogConfig`.
//!
//! File/rolling output (`tracing-appender`) is dropped here: dupfiles is a
//! one-shot CLI, not a long-running daemon, so there's nothing to roll logs
//! for (noted in DESIGN.md).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::error::DupfilesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(crate::error::DupfilesError::BadArgument {
                message: format!(
                    "invalid log level '{s}'. Valid options are: error, warn, info, debug, trace"
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

/// Initialize the global `tracing` subscriber. Safe to call at most once per
/// process; the CLI entry point is the only caller.
pub fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::new(level.as_str());

    let layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .boxed(),
    };

    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
