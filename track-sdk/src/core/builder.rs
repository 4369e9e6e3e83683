//! Gateway builder implementation
//!
//! Provides a builder for assembling an `AuthenticatedGateway` from its
//! collaborators, filling in configuration-driven defaults.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ApiConfig, DEFAULT_PROVIDER};
use crate::core::{HttpTransport, IdentityProvider};
use crate::diagnostics::{self, DiagnosticRecorder};
use crate::error::{Result, ServiceError};
use crate::gateway::AuthenticatedGateway;
use crate::transport::{build_http_client, ReqwestTransport, UserAgent};

/// Builder for the authenticated request gateway
#[derive(Default)]
pub struct GatewayBuilder {
    /// Base URL for the track API
    base_url: Option<String>,

    /// Identity collaborator (required)
    identity: Option<Arc<dyn IdentityProvider>>,

    /// Transport; a reqwest transport is built when absent
    transport: Option<Arc<dyn HttpTransport>>,

    /// Recorder; the process-wide one when absent
    recorder: Option<Arc<DiagnosticRecorder>>,

    /// Request timeout for the default transport
    timeout: Option<Duration>,

    /// User agent for the default transport
    user_agent: Option<UserAgent>,
}

impl GatewayBuilder {
    /// Create a new gateway builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the track API
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the identity provider
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set a custom transport
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Record diagnostics into a private recorder
    pub fn recorder(mut self, recorder: Arc<DiagnosticRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Build the gateway
    ///
    /// Base URL and timeout not set explicitly are read from the environment
    /// (`TRACKS_API_BASE_URL`, `TRACKS_API_TIMEOUT_SECONDS`).
    pub fn build(self) -> Result<AuthenticatedGateway> {
        let identity = self
            .identity
            .ok_or_else(|| ServiceError::configuration("An identity provider is required"))?;

        let mut config = ApiConfig::from_provider(&**DEFAULT_PROVIDER)?;
        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout.as_secs().max(1);
        }
        crate::config::ServiceConfig::validate(&config)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let timeout = self
                    .timeout
                    .unwrap_or_else(|| Duration::from_secs(config.timeout_seconds));
                let client = build_http_client(self.user_agent, Some(timeout))?;
                Arc::new(ReqwestTransport::with_client(client))
            }
        };

        let recorder = self.recorder.unwrap_or_else(diagnostics::recorder);

        Ok(AuthenticatedGateway::new(config.base_url, identity, transport, recorder))
    }
}
