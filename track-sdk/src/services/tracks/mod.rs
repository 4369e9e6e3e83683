//! Track API client
//!
//! Typed operations on the remote track API. Every call goes through the
//! authenticated gateway; non-2xx responses are turned into domain errors
//! here, since the gateway hands them back as plain data.

mod models;
pub use models::*;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use crate::core::{ApiResponse, IdentityProvider, RequestDescriptor, ServiceClient};
use crate::error::mapping::map_response_error;
use crate::error::{ErrorContext, Result, ServiceError};
use crate::gateway::AuthenticatedGateway;

const SERVICE_NAME: &str = "tracks";
const TRACKS_PATH: &str = "/api/tracks/";

/// Client for the learning-track API
#[derive(Clone)]
pub struct TracksClient {
    gateway: Arc<AuthenticatedGateway>,
}

impl TracksClient {
    /// Create a client on top of a gateway
    pub fn new(gateway: AuthenticatedGateway) -> Self {
        Self::with_gateway(Arc::new(gateway))
    }

    /// Create a client sharing a gateway with other clients
    pub fn with_gateway(gateway: Arc<AuthenticatedGateway>) -> Self {
        Self { gateway }
    }

    /// The underlying gateway
    pub fn gateway(&self) -> &AuthenticatedGateway {
        &self.gateway
    }

    /// All tracks of the signed-in user
    pub async fn list_tracks(&self) -> Result<Vec<Track>> {
        let response = self.gateway.execute(&RequestDescriptor::get(TRACKS_PATH)).await?;
        decode(&response, "fetch tracks", TRACKS_PATH)
    }

    /// Create a track from a title and an ordered list of articles
    pub async fn create_track(&self, track: NewTrack) -> Result<Track> {
        let track = track.normalized()?;
        let descriptor = RequestDescriptor::post(TRACKS_PATH).json_body(&track)?;

        let response = self.gateway.execute(&descriptor).await?;
        let created: Track = decode(&response, "create track", TRACKS_PATH)?;

        info!("Created track {} with {} articles", created.id, created.articles.len());
        Ok(created)
    }

    /// One track by identifier
    pub async fn get_track(&self, track_id: &str) -> Result<Track> {
        let path = track_path(track_id)?;
        let response = self.gateway.execute(&RequestDescriptor::get(&path)).await?;
        decode(&response, "fetch track", &path)
    }

    /// Update title, description and/or article list
    pub async fn update_track(&self, track_id: &str, update: &TrackUpdate) -> Result<Track> {
        let path = track_path(track_id)?;
        if update.is_empty() {
            return Err(ServiceError::validation("Nothing to update"));
        }
        if matches!(update.title.as_deref(), Some(title) if title.trim().is_empty()) {
            return Err(ServiceError::validation("Track title cannot be empty"));
        }

        let descriptor = RequestDescriptor::put(&path).json_body(update)?;
        let response = self.gateway.execute(&descriptor).await?;
        decode(&response, "update track", &path)
    }

    /// Delete a track
    pub async fn delete_track(&self, track_id: &str) -> Result<()> {
        let path = track_path(track_id)?;
        let response = self.gateway.execute(&RequestDescriptor::delete(&path)).await?;

        if !response.is_success() {
            return Err(response_error(&response, "delete track", &path));
        }
        info!("Deleted track {}", track_id);
        Ok(())
    }

    /// Mark one article (by URL) complete or not complete
    ///
    /// The track is fetched, the flag changed and the full article list
    /// written back, which is how the server expects progress updates.
    pub async fn set_article_completed(&self, track_id: &str, article_url: &str, completed: bool) -> Result<Track> {
        let mut track = self.get_track(track_id).await?;
        let index = track.article_position(article_url).ok_or_else(|| {
            ServiceError::not_found(format!("Article {} is not part of track {}", article_url, track_id))
        })?;

        if track.articles[index].completed == completed {
            debug!("Article {} already has completed={}", article_url, completed);
            return Ok(track);
        }

        track.articles[index].completed = completed;
        let update = TrackUpdate::new().articles(track.articles);
        self.update_track(track_id, &update).await
    }

    /// Flip the completion flag of one article
    pub async fn toggle_article_completion(&self, track_id: &str, article_url: &str) -> Result<Track> {
        let mut track = self.get_track(track_id).await?;
        let index = track.article_position(article_url).ok_or_else(|| {
            ServiceError::not_found(format!("Article {} is not part of track {}", article_url, track_id))
        })?;

        track.articles[index].completed = !track.articles[index].completed;
        let update = TrackUpdate::new().articles(track.articles);
        let updated = self.update_track(track_id, &update).await?;

        let progress = updated.progress();
        if progress.is_finished() {
            info!("Track {} completed: all {} articles done", track_id, progress.total);
        }
        Ok(updated)
    }

    /// Community tracks shared by other users, newest first
    pub async fn list_public_tracks(&self) -> Result<Vec<PublicTrack>> {
        let path = "/api/explore/tracks";
        let response = self.gateway.execute(&RequestDescriptor::get(path)).await?;
        let mut tracks: Vec<PublicTrack> = decode(&response, "fetch public tracks", path)?;
        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tracks)
    }

    /// Profile of the signed-in user
    pub async fn user_profile(&self) -> Result<UserProfile> {
        let path = "/api/user/profile";
        let response = self.gateway.execute(&RequestDescriptor::get(path)).await?;
        decode(&response, "fetch user profile", path)
    }

    /// End the session with the identity provider
    pub async fn sign_out(&self) -> Result<()> {
        let identity: &Arc<dyn IdentityProvider> = self.gateway.identity();
        identity.sign_out().await
    }
}

#[async_trait]
impl ServiceClient for TracksClient {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    fn base_url(&self) -> &str {
        self.gateway.base_url()
    }

    async fn health_check(&self) -> Result<bool> {
        match self.gateway.execute(&RequestDescriptor::get("/api/health")).await {
            Ok(response) if response.is_success() => {
                let healthy = response
                    .json::<HealthStatus>()
                    .map(|h| h.status == "healthy")
                    .unwrap_or(false);
                Ok(healthy)
            }
            Ok(response) => {
                warn!("Track API health check returned {}", response.status);
                Ok(false)
            }
            Err(e) => {
                warn!("Track API health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Ids are inserted into the path verbatim, so only URL-unreserved
/// characters are accepted.
fn track_path(track_id: &str) -> Result<String> {
    let track_id = track_id.trim();
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
    if track_id.is_empty() || track_id == "." || track_id == ".." || !track_id.chars().all(unreserved) {
        return Err(ServiceError::validation(format!("Invalid track id: {:?}", track_id)));
    }
    Ok(format!("/api/tracks/{}", track_id))
}

fn response_error(response: &ApiResponse, operation: &str, path: &str) -> ServiceError {
    map_response_error(operation, response, ErrorContext::for_service(SERVICE_NAME).endpoint(path))
}

fn decode<T: DeserializeOwned>(response: &ApiResponse, operation: &str, path: &str) -> Result<T> {
    if !response.is_success() {
        return Err(response_error(response, operation, path));
    }
    response.json()
}
