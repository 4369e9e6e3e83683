//! # Track SDK
//!
//! Client library for the Project Vista learning-tracks service.
//!
//! This crate provides:
//!
//! - An authenticated request gateway that attaches the bearer credential,
//!   refreshes an expired session once and retries the call once
//! - A bounded, process-wide diagnostic event recorder
//! - Typed clients for the track API and the article search provider
//! - Error handling and configuration utilities
//!
//! ## Architecture
//!
//! - `IdentityProvider`: Third-party session source (current, refresh, sign out)
//! - `HttpTransport`: One physical HTTP exchange, reqwest in production
//! - `AuthenticatedGateway`: One logical call, at most two attempts
//! - `DiagnosticRecorder`: Structured events for every attempt
//! - `ServiceError`: Error taxonomy with correlation context

// Re-export core modules
pub mod core;
pub use crate::core::{
    ApiResponse, GatewayBuilder, HttpTransport, IdentityProvider, RequestDescriptor, ServiceClient, Session,
};

pub mod gateway;
pub use gateway::AuthenticatedGateway;

pub mod diagnostics;
pub use diagnostics::{DiagnosticEvent, DiagnosticRecorder, FaultDetail, Severity};

// Re-export service-specific modules
pub mod services;
pub use services::articles::ArticleSearchClient;
pub use services::tracks::TracksClient;

// Re-export error handling
pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, ServiceConfig};

pub mod identity;
pub use identity::{InMemorySessionStore, StaticTokenIdentity};

pub mod transport;
pub use transport::ReqwestTransport;

// Utility module for common functionality
pub mod util;

#[cfg(test)]
mod tests;

/// Create a new gateway builder
pub fn gateway() -> GatewayBuilder {
    GatewayBuilder::new()
}

/// Create a track client authenticated with `TRACKS_ACCESS_TOKEN`
pub fn tracks_client() -> Result<TracksClient> {
    let identity = std::sync::Arc::new(StaticTokenIdentity::from_env()?);
    Ok(TracksClient::new(gateway().identity(identity).build()?))
}

/// Create a pre-configured article search client
pub fn article_search_client() -> Result<ArticleSearchClient> {
    ArticleSearchClient::new()
}
