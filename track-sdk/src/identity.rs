//! Simple identity providers
//!
//! The real identity provider is a third-party service. These implementations
//! cover command-line tools (a fixed token from the environment) and embedders
//! that manage sessions themselves.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::RwLock;

use crate::config::{ConfigProvider, DEFAULT_PROVIDER};
use crate::core::{IdentityProvider, Session};
use crate::error::{Result, ServiceError};

/// A fixed bearer token that cannot be refreshed
pub struct StaticTokenIdentity {
    session: RwLock<Option<Session>>,
}

impl StaticTokenIdentity {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            session: RwLock::new(Some(Session::new(access_token))),
        }
    }

    /// Read the token from `TRACKS_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self> {
        let token = DEFAULT_PROVIDER.get_string("access_token")?;
        Ok(Self::new(token))
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn refresh_session(&self) -> Result<()> {
        Err(ServiceError::session_expired("Static access tokens cannot be refreshed"))
    }

    async fn sign_out(&self) -> Result<()> {
        self.session.write().await.take();
        info!("Signed out; static access token discarded");
        Ok(())
    }
}

type Refresher = Box<dyn Fn() -> Result<Session> + Send + Sync>;

/// Session store with a pluggable refresh step
///
/// Without a refresher every refresh fails with `SessionExpired`.
pub struct InMemorySessionStore {
    session: RwLock<Option<Session>>,
    refresher: Option<Refresher>,
    refresh_count: AtomicUsize,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self {
            session: RwLock::new(None),
            refresher: None,
            refresh_count: AtomicUsize::new(0),
        }
    }
}

impl InMemorySessionStore {
    /// An empty store (signed out)
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `session`
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            ..Self::default()
        }
    }

    /// Set the function that produces a fresh session
    pub fn with_refresher<F>(mut self, refresher: F) -> Self
    where
        F: Fn() -> Result<Session> + Send + Sync + 'static,
    {
        self.refresher = Some(Box::new(refresher));
        self
    }

    /// Replace the current session
    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    /// How many refreshes were attempted
    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for InMemorySessionStore {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn refresh_session(&self) -> Result<()> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);

        let refresher = self
            .refresher
            .as_ref()
            .ok_or_else(|| ServiceError::session_expired("No refresh capability configured"))?;

        let session = refresher()?;
        debug!("Session refreshed, expires at {:?}", session.expires_at);
        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.session.write().await.take();
        Ok(())
    }
}
