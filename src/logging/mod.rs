use std::time::Instant;

use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::LoggingError;

/// Deployment flavour; picks sensible defaults for the other settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingEnvironment {
    #[default]
    Development,
    Testing,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human readable
    #[default]
    Pretty,
    /// One line per event
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub environment: LoggingEnvironment,
    /// Any `EnvFilter` directive, e.g. `info` or `yard_di=trace`.
    pub level: String,
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: "info".to_string(),
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn development() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: true,
        }
    }

    pub fn production() -> Self {
        Self {
            environment: LoggingEnvironment::Production,
            level: "info".to_string(),
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
        }
    }

    pub fn testing() -> Self {
        Self {
            environment: LoggingEnvironment::Testing,
            level: "error".to_string(),
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
        }
    }

    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level)
            .map_err(|e| LoggingError::InvalidFilter(self.level.clone(), e.to_string()))
    }
}

/// Installs the global tracing subscriber.
///
/// Fails instead of panicking when a subscriber is already installed, so hosts
/// and tests can call it more than once.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = config.filter()?;
    let ansi = config.environment != LoggingEnvironment::Production;

    let installed = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(ansi);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(ansi);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing::info!(
        environment = ?config.environment,
        level = %config.level,
        format = ?config.format,
        "Logging system initialized"
    );
    Ok(())
}

/// Times a single cache-miss resolution.
pub struct ResolutionTimer {
    start: Instant,
    entry: String,
    kind: String,
}

impl ResolutionTimer {
    pub fn new(entry: &str, kind: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            entry: entry.to_string(),
            kind: kind.into(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn finish(self, succeeded: bool) {
        let duration = self.start.elapsed();
        tracing::debug!(
            entry = %self.entry,
            kind = %self.kind,
            succeeded,
            duration_us = duration.as_micros() as u64,
            "Entry resolved"
        );
    }
}

/// Error logging that stays silent unless debugging is switched on.
pub trait ErrorLog {
    fn debug_enabled(&self) -> bool;

    fn log_error(&self, message: &str) {
        if !self.debug_enabled() {
            return;
        }
        tracing::error!("yard-di: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(LoggingConfig::production().format, LogFormat::Compact);
        assert_eq!(LoggingConfig::testing().level, "error");
        assert!(LoggingConfig::development().show_thread_ids);
    }

    #[test]
    fn rejects_bad_filter() {
        let config = LoggingConfig {
            level: "yard_di=notalevel".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(config.filter(), Err(LoggingError::InvalidFilter(..))));
    }

    #[test]
    fn deserializes_partial_section() {
        let config: LoggingConfig = toml::from_str("format = \"compact\"\nlevel = \"warn\"").unwrap();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.level, "warn");
        assert_eq!(config.environment, LoggingEnvironment::Development);
    }

    #[test]
    fn second_init_fails_without_panicking() {
        init_logging(&LoggingConfig::testing()).unwrap();
        let err = init_logging(&LoggingConfig::development()).unwrap_err();
        assert!(matches!(err, LoggingError::AlreadyInitialized));
    }

    struct Quiet;

    impl ErrorLog for Quiet {
        fn debug_enabled(&self) -> bool {
            false
        }
    }

    #[test]
    fn error_log_is_noop_without_debug() {
        Quiet.log_error("ignored");
    }
}
