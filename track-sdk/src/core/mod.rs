//! Core abstractions for the Track SDK
//!
//! This module provides the collaborator seams and the value types that flow
//! through the authenticated request gateway:
//!
//! - `IdentityProvider`: Supplies the bearer credential and refreshes it
//! - `HttpTransport`: Performs one physical HTTP exchange
//! - `ServiceClient`: Common surface of the typed API clients
//! - `RequestDescriptor` / `ApiResponse`: What goes in and what comes out
//! - `GatewayBuilder`: Builder pattern for creating gateways

pub mod builder;
pub use builder::GatewayBuilder;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, ServiceError};

/// Base trait for all service clients
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Health check for the service
    async fn health_check(&self) -> Result<bool>;
}

/// A bearer credential as handed out by the identity provider
#[derive(Clone, PartialEq)]
pub struct Session {
    /// Opaque bearer token
    pub access_token: String,

    /// When the provider considers the token expired
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session with no known expiry
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Set the expiry
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Whether the token can be presented at all
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Whether the expiry is known and already in the past
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| at <= Utc::now())
    }
}

// Tokens must not leak through debug output.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Third-party identity collaborator
///
/// The gateway only reads the current session and asks for a refresh; the
/// provider owns storage and synchronisation of the credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current session, `None` when nobody is signed in
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Ask the provider to obtain a fresh credential
    async fn refresh_session(&self) -> Result<()>;

    /// End the current session
    async fn sign_out(&self) -> Result<()>;
}

/// One logical call against the remote API
///
/// The path is relative to the gateway's base address. Header overrides win
/// over the headers the gateway computes.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: Method,
    /// Overrides keyed by lowercase name, applied in key order
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor for an arbitrary method
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// GET request (the default method)
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header override
    ///
    /// Names are case-insensitive: a later call for the same name replaces
    /// the earlier value. A name or value that is not valid in an HTTP header
    /// makes `execute` fail with a validation error before any network call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a pre-serialised body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialise a value as the JSON body
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_string(value)
            .map_err(|e| ServiceError::validation(format!("Failed to serialize request: {}", e)))?;
        Ok(self.body(body))
    }
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self::get("/")
    }
}

/// A fully composed physical request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// A response as received, never interpreted by the gateway
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,

    /// Canonical reason phrase for the status ("Not Found")
    pub reason: String,

    pub headers: HeaderMap,

    /// Raw body text
    pub body: String,
}

impl ApiResponse {
    /// Create a response with an empty header map
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();

        Self {
            status,
            reason,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body text
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ServiceError::parsing(format!("Failed to parse response: {}", e)))
    }
}

/// Classification of a failed physical exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Request,
    Body,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "ConnectError",
            TransportErrorKind::Timeout => "TimeoutError",
            TransportErrorKind::Request => "RequestError",
            TransportErrorKind::Body => "BodyError",
            TransportErrorKind::Other => "TransportError",
        }
    }
}

/// Failure raised while the exchange itself was in flight
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", kind.as_str())]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_builder() || err.is_request() {
            TransportErrorKind::Request
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };

        TransportError::new(kind, err.to_string())
    }
}

// Every in-flight failure, timeouts included, is a network error to the caller.
impl From<TransportError> for ServiceError {
    fn from(err: TransportError) -> Self {
        ServiceError::network(err.to_string())
    }
}

/// Performs one HTTP exchange and reads the whole body
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> std::result::Result<ApiResponse, TransportError>;
}
