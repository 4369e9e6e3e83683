//! Data models for the article search provider

use serde::{Deserialize, Serialize};

use crate::services::tracks::Article;

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSearchResult {
    pub title: String,
    pub url: String,
    /// Snippet with markup removed
    pub description: String,
}

impl ArticleSearchResult {
    /// Turn the hit into a not-yet-completed track article
    pub fn into_article(self) -> Article {
        Article::new(self.title, self.url).with_description(self.description)
    }
}

/// Raw search payload (`action=query&list=search`)
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(default)]
    pub query: Option<SearchQuery>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub search: Option<Vec<SearchHit>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}
