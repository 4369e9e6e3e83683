//! Data models for the track API

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// A reference article inside a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: None,
            completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An ordered learning track owned by the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub articles: Vec<Article>,
    /// UTC, as emitted by the server without an offset
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// How far along a track the user is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackProgress {
    pub completed: usize,
    pub total: usize,
    /// 0.0 ..= 100.0; an empty track is 0
    pub percent: f64,
}

impl TrackProgress {
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

impl Track {
    /// Completion summary over the track's articles
    pub fn progress(&self) -> TrackProgress {
        let total = self.articles.len();
        let completed = self.articles.iter().filter(|a| a.completed).count();
        let percent = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        TrackProgress {
            completed,
            total,
            percent,
        }
    }

    /// Index of the article with the given URL
    pub fn article_position(&self, url: &str) -> Option<usize> {
        self.articles.iter().position(|a| a.url == url)
    }
}

/// Payload for creating a track
#[derive(Debug, Clone, Serialize)]
pub struct NewTrack {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_public: bool,
    pub articles: Vec<Article>,
}

impl NewTrack {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            is_public: false,
            articles: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Append an article; a title already present is rejected
    pub fn add_article(&mut self, article: Article) -> Result<()> {
        if self.articles.iter().any(|a| a.title == article.title) {
            return Err(ServiceError::validation(format!(
                "\"{}\" is already part of this track",
                article.title
            )));
        }
        self.articles.push(article);
        Ok(())
    }

    /// Builder form of [`NewTrack::add_article`]
    pub fn article(mut self, article: Article) -> Result<Self> {
        self.add_article(article)?;
        Ok(self)
    }

    /// Trim the title and check the track can be created
    pub(crate) fn normalized(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(ServiceError::validation("Please enter a title for your track"));
        }
        if self.articles.is_empty() {
            return Err(ServiceError::validation("Please add at least one article to your track"));
        }
        Ok(self)
    }
}

/// Partial update of a track's mutable fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<Vec<Article>>,
}

impl TrackUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn articles(mut self, articles: Vec<Article>) -> Self {
        self.articles = Some(articles);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.articles.is_none()
    }
}

/// Creator of a community track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A track shared with the community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTrack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub creator: CreatorInfo,
    pub articles_count: usize,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub participant_count: u64,
    #[serde(default)]
    pub is_joined: bool,
}

/// Profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Name to show, falling back to the local part of the email
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// Health endpoint payload
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}
