//! Article search client
//!
//! Full-text search against the public encyclopedia that supplies track
//! articles. No bearer credential is involved; requests go straight through
//! the transport and are recorded like gateway calls.

mod models;
pub use models::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use url::Url;

use crate::config::{ArticleSearchConfig, ServiceConfig, DEFAULT_PROVIDER};
use crate::core::{HttpRequest, HttpTransport, ServiceClient};
use crate::diagnostics::{self, context, duration_ms, DiagnosticRecorder, FaultDetail};
use crate::error::mapping::map_response_error;
use crate::error::{ErrorContext, Result, ServiceError};
use crate::transport::{build_http_client, ReqwestTransport};
use crate::util::{generate_correlation_id, strip_html_tags};

const SERVICE_NAME: &str = "articles";
const SEARCH_PATH: &str = "/w/api.php";

/// Shortest query (in characters, after trimming) that is sent to the provider
pub const MIN_QUERY_CHARS: usize = 2;

/// Client for the article search provider
pub struct ArticleSearchClient {
    config: ArticleSearchConfig,
    transport: Arc<dyn HttpTransport>,
    recorder: Arc<DiagnosticRecorder>,
}

impl ArticleSearchClient {
    /// Create a client configured from the environment
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a new builder
    pub fn builder() -> ArticleSearchClientBuilder {
        ArticleSearchClientBuilder::default()
    }

    pub fn config(&self) -> &ArticleSearchConfig {
        &self.config
    }

    /// Search articles matching `query`
    ///
    /// Queries shorter than [`MIN_QUERY_CHARS`] return no results without a
    /// network call. Snippet markup is stripped from the descriptions.
    ///
    /// Transport failures and non-2xx statuses are recorded and returned as
    /// errors, not as an empty list. Callers that only want suggestions
    /// should treat an error as "no results" themselves.
    pub async fn search(&self, query: &str) -> Result<Vec<ArticleSearchResult>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            debug!("Skipping article search for short query {:?}", query);
            return Ok(Vec::new());
        }

        let url = self.search_url(query)?;
        let correlation_id = generate_correlation_id();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let request = HttpRequest {
            method: Method::GET,
            url: url.to_string(),
            headers,
            body: None,
        };

        self.recorder.log_request("GET", SEARCH_PATH, &correlation_id);
        let started = Instant::now();

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                let elapsed = started.elapsed();
                error!("Error searching articles for {:?}: {}", query, err);
                self.recorder.record_error(
                    "Article search failed",
                    Some(context(serde_json::json!({
                        "method": "GET",
                        "path": SEARCH_PATH,
                        "query": query,
                        "duration_ms": duration_ms(elapsed),
                        "correlation_id": correlation_id,
                    }))),
                    Some(&FaultDetail::from(&err)),
                );
                return Err(ServiceError::from(err).with_context(self.error_context(&correlation_id)));
            }
        };

        self.recorder.log_response(
            "GET",
            SEARCH_PATH,
            response.status,
            started.elapsed(),
            &correlation_id,
        );

        if !response.is_success() {
            warn!("Article search returned {}", response.status);
            return Err(map_response_error(
                "search articles",
                &response,
                self.error_context(&correlation_id),
            ));
        }

        let envelope: SearchEnvelope = response.json()?;
        let hits = envelope
            .query
            .and_then(|q| q.search)
            .unwrap_or_default();

        hits.into_iter()
            .map(|hit| -> Result<ArticleSearchResult> {
                Ok(ArticleSearchResult {
                    url: self.article_url(&hit.title)?,
                    description: strip_html_tags(&hit.snippet),
                    title: hit.title,
                })
            })
            .collect()
    }

    /// Canonical page address for an article title
    ///
    /// Spaces become underscores; everything else is percent-encoded as a
    /// single path segment.
    pub fn article_url(&self, title: &str) -> Result<String> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::configuration("Search base URL cannot hold a path"))?
            .pop_if_empty()
            .push("wiki")
            .push(&title.replace(' ', "_"));
        Ok(url.to_string())
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::configuration("Search base URL cannot hold a path"))?
            .pop_if_empty()
            .push("w")
            .push("api.php");
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("list", "search")
            .append_pair("srsearch", query)
            .append_pair("srlimit", &self.config.result_limit.to_string())
            .append_pair("origin", "*");
        Ok(url)
    }

    fn base(&self) -> Result<Url> {
        Url::parse(&self.config.base_url)
            .map_err(|e| ServiceError::configuration(format!("Invalid search base URL: {}", e)))
    }

    fn error_context(&self, correlation_id: &str) -> ErrorContext {
        ErrorContext::for_service(SERVICE_NAME)
            .correlation_id(correlation_id)
            .endpoint(SEARCH_PATH)
    }
}

#[async_trait]
impl ServiceClient for ArticleSearchClient {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn health_check(&self) -> Result<bool> {
        match self.search("health").await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Article search health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Builder for the article search client
#[derive(Default)]
pub struct ArticleSearchClientBuilder {
    base_url: Option<String>,
    result_limit: Option<u32>,
    timeout_seconds: Option<u64>,
    transport: Option<Arc<dyn HttpTransport>>,
    recorder: Option<Arc<DiagnosticRecorder>>,
}

impl ArticleSearchClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the maximum number of results
    pub fn result_limit(mut self, limit: u32) -> Self {
        self.result_limit = Some(limit);
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
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

    /// Build the client
    pub fn build(self) -> Result<ArticleSearchClient> {
        let mut config = ArticleSearchConfig::from_provider(&**DEFAULT_PROVIDER)?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(limit) = self.result_limit {
            config.result_limit = limit;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }
        config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let client = build_http_client(None, Some(Duration::from_secs(config.timeout_seconds)))?;
                Arc::new(ReqwestTransport::with_client(client))
            }
        };

        Ok(ArticleSearchClient {
            config,
            transport,
            recorder: self.recorder.unwrap_or_else(diagnostics::recorder),
        })
    }
}
