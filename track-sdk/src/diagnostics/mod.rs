//! Diagnostic event recorder
//!
//! A bounded, append-only, in-memory log of structured events produced by the
//! gateway and any other caller. The newest `capacity` events are kept in
//! insertion order; older ones are evicted first. Recording never fails.
//!
//! One recorder lives for the whole process (see [`recorder`]). Tests and
//! embedders can create private instances and hand them to a gateway.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{DiagnosticsConfig, DEFAULT_PROVIDER};
use crate::core::TransportError;
use crate::util::sanitize_for_logging;

/// Default number of events kept in memory
pub const DEFAULT_CAPACITY: usize = 100;

const ECHO_TARGET: &str = "track_sdk::diagnostics";

/// Structured context attached to an event
pub type EventContext = Map<String, Value>;

/// Reserved context keys
pub mod keys {
    pub const ERROR_NAME: &str = "error_name";
    pub const ERROR_MESSAGE: &str = "error_message";
    pub const ERROR_STACK: &str = "error_stack";
    pub const METHOD: &str = "method";
    pub const PATH: &str = "path";
    pub const STATUS: &str = "status";
    pub const DURATION_MS: &str = "duration_ms";
    pub const CORRELATION_ID: &str = "correlation_id";
    pub const TYPE: &str = "type";
}

static GLOBAL_RECORDER: Lazy<Arc<DiagnosticRecorder>> = Lazy::new(|| {
    let config = DiagnosticsConfig::from_provider(&**DEFAULT_PROVIDER);
    Arc::new(DiagnosticRecorder::from_config(&config))
});

/// The process-wide recorder
pub fn recorder() -> Arc<DiagnosticRecorder> {
    Arc::clone(&GLOBAL_RECORDER)
}

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// ERROR for status >= 400, INFO otherwise
    pub fn for_status(status: u16) -> Self {
        if status >= 400 {
            Severity::Error
        } else {
            Severity::Info
        }
    }

    fn log_level(&self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured details of a fault that accompanies an ERROR event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultDetail {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl FaultDetail {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture any error, rendering its source chain as the stack text
    pub fn from_error(name: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        let fault = Self::new(name, err.to_string());
        if chain.is_empty() {
            fault
        } else {
            fault.with_stack(chain.join("\n"))
        }
    }

    fn fold_into(&self, context: &mut EventContext) {
        context.insert(keys::ERROR_NAME.into(), Value::String(self.name.clone()));
        context.insert(
            keys::ERROR_MESSAGE.into(),
            Value::String(sanitize_for_logging(&self.message)),
        );
        if let Some(ref stack) = self.stack {
            context.insert(keys::ERROR_STACK.into(), Value::String(sanitize_for_logging(stack)));
        }
    }
}

impl From<&TransportError> for FaultDetail {
    fn from(err: &TransportError) -> Self {
        FaultDetail::new(err.kind.as_str(), err.message.clone())
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub context: EventContext,
}

impl DiagnosticEvent {
    /// A context value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// The correlation id this event was tagged with
    pub fn correlation_id(&self) -> Option<&str> {
        self.get(keys::CORRELATION_ID).and_then(Value::as_str)
    }

    /// The status code carried by a response event
    pub fn status(&self) -> Option<u16> {
        self.get(keys::STATUS)
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
    }
}

/// Build an event context from a JSON object literal
///
/// Non-object values are stored under a single `value` key.
pub fn context(value: Value) -> EventContext {
    match value {
        Value::Object(map) => map,
        Value::Null => EventContext::new(),
        other => {
            let mut map = EventContext::new();
            map.insert("value".into(), other);
            map
        }
    }
}

/// Bounded FIFO of diagnostic events
#[derive(Debug)]
pub struct DiagnosticRecorder {
    capacity: usize,
    echo: bool,
    buffer: Mutex<VecDeque<DiagnosticEvent>>,
}

impl Default for DiagnosticRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DiagnosticRecorder {
    /// Create a recorder that keeps at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            echo: false,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Create a recorder from configuration
    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self::new(config.capacity).with_echo(config.echo)
    }

    /// Mirror every event to the `log` facade
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated, so a
    // poisoned lock is still safe to use.
    fn buffer(&self) -> MutexGuard<'_, VecDeque<DiagnosticEvent>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event stamped with the current time
    pub fn record(&self, severity: Severity, message: impl Into<String>, context: Option<EventContext>) {
        let event = DiagnosticEvent {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            context: context.unwrap_or_default(),
        };

        if self.echo {
            self.echo_event(&event);
        }

        let mut buffer = self.buffer();
        buffer.push_back(event);
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
    }

    /// Append an ERROR event, folding the fault into the context
    pub fn record_error(
        &self,
        message: impl Into<String>,
        context: Option<EventContext>,
        fault: Option<&FaultDetail>,
    ) {
        let mut context = context.unwrap_or_default();
        if let Some(fault) = fault {
            fault.fold_into(&mut context);
        }
        self.record(Severity::Error, message, Some(context));
    }

    pub fn debug(&self, message: impl Into<String>, context: Option<EventContext>) {
        self.record(Severity::Debug, message, context);
    }

    pub fn info(&self, message: impl Into<String>, context: Option<EventContext>) {
        self.record(Severity::Info, message, context);
    }

    pub fn warn(&self, message: impl Into<String>, context: Option<EventContext>) {
        self.record(Severity::Warn, message, context);
    }

    pub fn error(&self, message: impl Into<String>, context: Option<EventContext>) {
        self.record(Severity::Error, message, context);
    }

    /// Record the start of an outbound API request
    pub fn log_request(&self, method: &str, path: &str, correlation_id: &str) {
        self.info(
            "API Request",
            Some(context(json!({
                "method": method,
                "path": path,
                "correlation_id": correlation_id,
                "type": "api_request",
            }))),
        );
    }

    /// Record the outcome of an API request; severity follows the status
    pub fn log_response(
        &self,
        method: &str,
        path: &str,
        status: u16,
        duration: Duration,
        correlation_id: &str,
    ) {
        self.record(
            Severity::for_status(status),
            format!("API Response - {}", status),
            Some(context(json!({
                "method": method,
                "path": path,
                "status": status,
                "duration_ms": duration_ms(duration),
                "correlation_id": correlation_id,
                "type": "api_response",
            }))),
        );
    }

    /// The last `count` events in insertion order
    pub fn recent(&self, count: usize) -> Vec<DiagnosticEvent> {
        let buffer = self.buffer();
        let skip = buffer.len().saturating_sub(count);
        buffer.iter().skip(skip).cloned().collect()
    }

    /// Every buffered event in insertion order
    pub fn snapshot(&self) -> Vec<DiagnosticEvent> {
        self.buffer().iter().cloned().collect()
    }

    /// The last `count` events as a JSON array, for error-reporting hooks
    pub fn export_json(&self, count: usize) -> String {
        serde_json::to_string(&self.recent(count)).unwrap_or_else(|_| "[]".to_string())
    }

    /// Drop every buffered event
    pub fn clear(&self) {
        self.buffer().clear();
    }

    fn echo_event(&self, event: &DiagnosticEvent) {
        log::log!(
            target: ECHO_TARGET,
            event.severity.log_level(),
            "[{}] {}: {} {}",
            event.timestamp.to_rfc3339(),
            event.severity,
            event.message,
            Value::Object(event.context.clone())
        );
    }
}

/// Milliseconds with sub-millisecond precision
pub fn duration_ms(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1_000_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_status() {
        assert_eq!(Severity::for_status(200), Severity::Info);
        assert_eq!(Severity::for_status(399), Severity::Info);
        assert_eq!(Severity::for_status(400), Severity::Error);
        assert_eq!(Severity::for_status(503), Severity::Error);
    }

    #[test]
    fn test_context_from_non_object() {
        assert!(context(Value::Null).is_empty());
        assert_eq!(context(json!(5)).get("value"), Some(&json!(5)));
    }

    #[test]
    fn test_fault_from_error_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "dns lookup failed");
        let outer = TransportError::new(crate::core::TransportErrorKind::Connect, "connect");
        let fault = FaultDetail::from(&outer);
        assert_eq!(fault.name, "ConnectError");

        let fault = FaultDetail::from_error("IoError", &inner);
        assert_eq!(fault.message, "dns lookup failed");
        assert!(fault.stack.is_none());
    }
}
