//! Error handling for the Track SDK
//!
//! This module provides the error taxonomy surfaced to callers:
//! - Fatal gateway outcomes (authentication, expired session, network)
//! - Domain errors that callers derive from non-2xx responses
//! - Rich context (service, status, correlation id) for debugging
//! - A convenient Result type alias

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::core::TransportError;

pub mod mapping;

/// Result type for Track SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the Track SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No usable credential could be obtained from the identity provider
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The credential expired and refreshing the session failed
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Transport-level failure (DNS, connect, reset, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// The transport gave up waiting for a response
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response converted into an error by a caller
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

impl ServiceError {
    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    /// Create a session expired error
    pub fn session_expired(message: impl Into<String>) -> Self {
        ServiceError::SessionExpired(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create an API error for a status the caller could not handle
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Api {
            status,
            message: message.into(),
        }
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let mut context = ErrorContext::new();
        context.add(key, value);
        self.with_context(context)
    }

    /// The underlying error with all context layers removed
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// The outermost context attached to this error, if any
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ServiceError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the service name if available
    pub fn service_name(&self) -> Option<&str> {
        self.context().map(|c| c.service.as_str())
    }

    /// Get the correlation id if available
    pub fn correlation_id(&self) -> Option<&str> {
        self.context().and_then(|c| c.correlation_id.as_deref())
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Api { status, .. } => Some(*status),
            ServiceError::WithContext { inner, context } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Whether the user has to sign in again before this can succeed
    pub fn requires_login(&self) -> bool {
        matches!(
            self.root(),
            ServiceError::Authentication(_) | ServiceError::SessionExpired(_)
        )
    }

    /// Whether a manual retry of the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), ServiceError::Network(_) | ServiceError::Timeout(_))
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// When the error was observed
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Correlation id of the logical call
    pub correlation_id: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            correlation_id: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add a correlation id
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a context value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}

/// Convert reqwest errors to ServiceError
///
/// Classified the same way as transport failures, so a timeout is a network
/// error here too.
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let mut context = ErrorContext::for_service("http_client");
        if let Some(status) = err.status() {
            context = context.status_code(status.as_u16());
        }

        ServiceError::from(TransportError::from(err)).with_context(context)
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
            .with_context(ErrorContext::for_service("json"))
    }
}
