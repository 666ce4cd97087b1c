//! One-line JSON event formatter.
//!
//! [`JsonFormatter`] implements `tracing-subscriber`'s [`FormatEvent`],
//! so it plugs into `fmt::layer().event_format(..)` and the fmt layer
//! keeps ownership of the writer. Each event becomes one [`LogDocument`]
//! enriched with the current [`RequestContext`](crate::context::RequestContext).
//!
//! Structured fields that JSON cannot represent natively (`Debug`-only
//! values, non-finite floats, 128-bit integers out of `i64`/`u64` range)
//! are stored as strings. A field value never makes the log call fail.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_log::NormalizeEvent;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

use crate::context::{self, RequestContext};
use crate::error::CorrelogError;

/// Field names that never land in `extra`.
const EXCLUDED_FIELDS: &[&str] = &[
    // bookkeeping
    "message",
    "log.target",
    "log.module_path",
    "log.file",
    "log.line",
    "log.level",
    // top-level document fields
    "timestamp",
    "level",
    "service",
    "correlationId",
    "path",
    "method",
    "context",
    "extra",
];

const ERROR_KEY: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogDocument {
    pub timestamp: String,
    pub level: String,
    pub service: String,
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub message: String,
    pub context: String,
    pub extra: BTreeMap<String, Value>,
}

impl LogDocument {
    /// Serialize as a single JSON line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Message, structured fields, and attached error pulled out of one event.
#[derive(Debug, Default)]
pub struct EventFields {
    pub message: String,
    pub extra: BTreeMap<String, Value>,
    pub error: Option<String>,
}

impl EventFields {
    fn insert(&mut self, name: &str, value: Value) {
        if EXCLUDED_FIELDS.contains(&name) {
            return;
        }
        self.extra.insert(name.to_string(), value);
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.insert(field.name(), Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.insert(field.name(), Value::String(format!("{value:?}")));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field.name(), Value::from(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        let value = i64::try_from(value).map_or_else(|_| Value::String(value.to_string()), Value::from);
        self.insert(field.name(), value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        let value = u64::try_from(value).map_or_else(|_| Value::String(value.to_string()), Value::from);
        self.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map_or_else(|| Value::String(value.to_string()), Value::Number);
        self.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field.name(), Value::Bool(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.error = Some(error_trace(value));
    }
}

/// Render an error and its whole `source()` chain, one cause per line.
#[must_use]
pub fn error_trace(err: &(dyn std::error::Error + 'static)) -> String {
    use std::fmt::Write;
    let mut trace = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        // write! to String is infallible
        let _ = write!(trace, "\ncaused by: {cause}");
        source = cause.source();
    }
    trace
}

#[derive(Debug, Clone)]
pub struct JsonFormatter {
    service: String,
}

impl JsonFormatter {
    /// Fails when `service` is empty or only whitespace.
    pub fn new(service: impl Into<String>) -> Result<Self, CorrelogError> {
        let service = service.into();
        if service.trim().is_empty() {
            return Err(CorrelogError::InvalidConfiguration(
                "service name must not be empty".into(),
            ));
        }
        Ok(Self { service })
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Assemble a document from already-extracted event parts.
    #[must_use]
    pub fn build(
        &self,
        level: &tracing::Level,
        file: Option<&str>,
        line: Option<u32>,
        fields: EventFields,
        request: RequestContext,
        at: DateTime<Utc>,
    ) -> LogDocument {
        let EventFields {
            message,
            mut extra,
            error,
        } = fields;
        if let Some(error) = error {
            extra.insert(ERROR_KEY.to_string(), Value::String(error));
        }

        LogDocument {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            level: level.as_str().to_string(),
            service: self.service.clone(),
            correlation_id: request.correlation_id,
            path: request.path,
            method: request.method,
            message,
            context: format!(
                "{}:{}",
                file.unwrap_or_default(),
                line.map(|l| l.to_string()).unwrap_or_default()
            ),
            extra,
        }
    }

    /// Build the document for `event` against the current request context.
    ///
    /// Records bridged from the `log` crate carry their real level and
    /// location in `log.*` fields; those are used instead of the bridge's
    /// own callsite.
    #[must_use]
    pub fn document(&self, event: &Event<'_>) -> LogDocument {
        let normalized = event.normalized_metadata();
        let meta = normalized.as_ref().unwrap_or_else(|| event.metadata());
        let mut fields = EventFields::default();
        event.record(&mut fields);
        self.build(
            meta.level(),
            meta.file(),
            meta.line(),
            fields,
            context::current(),
            Utc::now(),
        )
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let line = self.document(event).to_line().map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}
