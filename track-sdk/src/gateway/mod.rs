//! Authenticated request gateway
//!
//! Wraps every call to the remote track API:
//!
//! 1. Reads the current session from the identity provider and fails with an
//!    authentication error before touching the network when there is none.
//! 2. Composes headers: `Authorization: Bearer <token>` and a JSON content
//!    type, overridden by any header the caller supplied.
//! 3. Sends the request, recording a request event and an outcome event.
//! 4. On a 401, refreshes the session once and retries once with the same
//!    correlation id. Whatever the retry returns goes back to the caller.
//!
//! Responses are never interpreted here; a 404 or 500 is data for the caller.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::json;

use crate::core::{
    ApiResponse, GatewayBuilder, HttpRequest, HttpTransport, IdentityProvider, RequestDescriptor, Session,
};
use crate::diagnostics::{context, duration_ms, DiagnosticRecorder, EventContext, FaultDetail};
use crate::error::{ErrorContext, Result, ServiceError};
use crate::util::generate_correlation_id;

const SERVICE_NAME: &str = "tracks";

/// Bookkeeping for one logical call, shared by the original attempt and the
/// single retry
#[derive(Debug, Clone)]
struct AttemptRecord {
    method: String,
    path: String,
    correlation_id: String,
    started_at: Instant,
}

impl AttemptRecord {
    fn start(descriptor: &RequestDescriptor) -> Self {
        Self {
            method: descriptor.method.to_string(),
            path: descriptor.path.clone(),
            correlation_id: generate_correlation_id(),
            started_at: Instant::now(),
        }
    }

    fn event_context(&self) -> EventContext {
        context(json!({
            "method": self.method,
            "path": self.path,
            "correlation_id": self.correlation_id,
        }))
    }

    fn error_context(&self) -> ErrorContext {
        ErrorContext::for_service(SERVICE_NAME)
            .correlation_id(self.correlation_id.clone())
            .endpoint(self.path.clone())
    }
}

/// Gateway for calls that need a bearer credential
pub struct AuthenticatedGateway {
    base_url: String,
    identity: Arc<dyn IdentityProvider>,
    transport: Arc<dyn HttpTransport>,
    recorder: Arc<DiagnosticRecorder>,
}

impl AuthenticatedGateway {
    /// Create a gateway from its collaborators
    pub fn new(
        base_url: impl Into<String>,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn HttpTransport>,
        recorder: Arc<DiagnosticRecorder>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            identity,
            transport,
            recorder,
        }
    }

    /// Create a new builder
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The identity provider, for sign-out and session inspection
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// The recorder this gateway writes to
    pub fn recorder(&self) -> &Arc<DiagnosticRecorder> {
        &self.recorder
    }

    /// Perform one logical call
    ///
    /// Fails with `Authentication` (no usable credential), `SessionExpired`
    /// (refresh after a 401 failed) or `Network` (transport failure on either
    /// attempt). A malformed header override is a caller bug and fails with
    /// `Validation` before anything is sent. Every error carries the call's
    /// correlation id in its context.
    #[tracing::instrument(skip_all, fields(method = %descriptor.method, path = %descriptor.path))]
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse> {
        let attempt = AttemptRecord::start(descriptor);

        let session = self.bearer_session(&attempt).await?;
        let response = self.send_attempt(descriptor, &session, &attempt).await?;

        if response.status != StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }

        warn!(
            "Token expired for {} {} [{}], attempting refresh",
            attempt.method, attempt.path, attempt.correlation_id
        );
        self.recorder
            .warn("Token expired, attempting refresh", Some(attempt.event_context()));

        if let Err(err) = self.identity.refresh_session().await {
            error!("Session refresh failed [{}]: {}", attempt.correlation_id, err);
            self.recorder.record_error(
                "Session refresh failed",
                Some(attempt.event_context()),
                Some(&FaultDetail::from_error("RefreshError", &err)),
            );
            return Err(ServiceError::session_expired("Session expired, please log in again")
                .with_context(attempt.error_context()));
        }

        let session = self.bearer_session(&attempt).await?;

        // The retry's response is final, whatever its status.
        let response = self.send_attempt(descriptor, &session, &attempt).await?;
        debug!(
            "{} {} [{}] finished after refresh in {:?}",
            attempt.method,
            attempt.path,
            attempt.correlation_id,
            attempt.started_at.elapsed()
        );
        Ok(response)
    }

    async fn bearer_session(&self, attempt: &AttemptRecord) -> Result<Session> {
        let session = match self.identity.current_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("Session error [{}]: {}", attempt.correlation_id, err);
                self.recorder.record_error(
                    "Session error",
                    Some(attempt.event_context()),
                    Some(&FaultDetail::from_error("SessionError", &err)),
                );
                return Err(ServiceError::authentication("Authentication error")
                    .with_context(attempt.error_context()));
            }
        };

        match session {
            Some(session) if session.is_usable() => {
                if session.is_expired() {
                    debug!("Presenting a locally expired session [{}]", attempt.correlation_id);
                }
                Ok(session)
            }
            _ => Err(ServiceError::authentication("Not authenticated").with_context(attempt.error_context())),
        }
    }

    async fn send_attempt(
        &self,
        descriptor: &RequestDescriptor,
        session: &Session,
        attempt: &AttemptRecord,
    ) -> Result<ApiResponse> {
        let request = HttpRequest {
            method: descriptor.method.clone(),
            url: self.url_for(&descriptor.path),
            headers: compose_headers(descriptor, session)
                .map_err(|e| e.with_context(attempt.error_context()))?,
            body: descriptor.body.clone(),
        };

        self.recorder
            .log_request(&attempt.method, &attempt.path, &attempt.correlation_id);

        let sent_at = Instant::now();
        match self.transport.send(request).await {
            Ok(response) => {
                self.recorder.log_response(
                    &attempt.method,
                    &attempt.path,
                    response.status,
                    sent_at.elapsed(),
                    &attempt.correlation_id,
                );
                Ok(response)
            }
            Err(err) => {
                let elapsed = sent_at.elapsed();
                error!(
                    "API call failed: {} {} [{}] after {:?}: {}",
                    attempt.method, attempt.path, attempt.correlation_id, elapsed, err
                );

                let mut event_context = attempt.event_context();
                event_context.insert("duration_ms".into(), json!(duration_ms(elapsed)));
                event_context.insert("type".into(), json!("api_failure"));
                self.recorder
                    .record_error("API call failed", Some(event_context), Some(&FaultDetail::from(&err)));

                Err(ServiceError::from(err).with_context(attempt.error_context()))
            }
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Computed headers first, caller overrides last so they win on collision
fn compose_headers(descriptor: &RequestDescriptor, session: &Session) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", session.access_token))
        .map_err(|_| ServiceError::authentication("Access token is not a valid header value"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &descriptor.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ServiceError::validation(format!("Invalid header name {}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ServiceError::validation(format!("Invalid header value for {}: {}", name, e)))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_headers_defaults() {
        let descriptor = RequestDescriptor::get("/api/tracks/");
        let headers = compose_headers(&descriptor, &Session::new("tok")).unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_compose_headers_override_is_case_insensitive() {
        let descriptor = RequestDescriptor::get("/api/tracks/")
            .header("authorization", "Basic abc")
            .header("Content-Type", "text/plain");
        let headers = compose_headers(&descriptor, &Session::new("tok")).unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic abc");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_compose_headers_last_override_wins() {
        let descriptor = RequestDescriptor::get("/")
            .header("authorization", "Basic first")
            .header("Authorization", "Basic second");
        assert_eq!(descriptor.headers.len(), 1);

        let headers = compose_headers(&descriptor, &Session::new("tok")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic second");
    }

    #[test]
    fn test_compose_headers_rejects_bad_name() {
        let descriptor = RequestDescriptor::get("/").header("bad header", "x");
        let err = compose_headers(&descriptor, &Session::new("tok")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
