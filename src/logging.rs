//! Logging setup and the one-call application entrypoint.
//!
//! Builds a `tracing-subscriber` registry with a `Targets` threshold and
//! either the [`JsonFormatter`] (production) or pretty-printed output
//! (TTY / local dev). [`configure`] is the integration point for an axum
//! application: it installs JSON logging for the given service and wraps
//! the router in [`CorrelationLayer`].

use axum::Router;
use clap::ValueEnum;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;
use crate::error::CorrelogError;
use crate::formatter::JsonFormatter;
use crate::middleware::CorrelationLayer;

/// Environment variable holding the severity threshold.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Parse a severity name, case-insensitively. Accepts `WARNING` and
/// `CRITICAL` alongside the tracing level names.
pub fn parse_level(name: &str) -> Result<LogLevel, CorrelogError> {
    LogLevel::from_str(name.trim(), true).map_err(|_| {
        CorrelogError::InvalidConfiguration(format!("unknown log level '{name}'"))
    })
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub service: String,
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// JSON output at the threshold named by `LOG_LEVEL` (default `INFO`).
    pub fn from_env(service: impl Into<String>) -> Result<Self, CorrelogError> {
        let level = match std::env::var(LOG_LEVEL_ENV) {
            Ok(name) if !name.trim().is_empty() => parse_level(&name)?,
            _ => LogLevel::Info,
        };
        Ok(Self {
            service: service.into(),
            level,
            format: LogFormat::Json,
        })
    }
}

/// Install the process-wide subscriber and the `log` bridge, so records
/// from `log`-based dependencies are formatted the same way. Fails if the
/// service name is empty or a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), CorrelogError> {
    let formatter = JsonFormatter::new(config.service.clone())?;
    let filter = Targets::new().with_default(config.level.to_tracing_level());

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().event_format(formatter))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| CorrelogError::LoggingInit(e.to_string()))
}

/// Wire correlation logging into an axum application.
///
/// Validates `service`, installs JSON logging at the `LOG_LEVEL`
/// threshold, and returns `router` wrapped in [`CorrelationLayer`].
pub fn configure<S>(router: Router<S>, service: &str) -> Result<Router<S>, CorrelogError>
where
    S: Clone + Send + Sync + 'static,
{
    if service.trim().is_empty() {
        return Err(CorrelogError::InvalidConfiguration(
            "service name must be provided for logging configuration".into(),
        ));
    }
    init(&LoggingConfig::from_env(service)?)?;
    Ok(router.layer(CorrelationLayer::new()))
}
