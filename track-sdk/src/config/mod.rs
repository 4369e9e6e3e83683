//! Configuration management for the Track SDK
//!
//! This module provides utilities for loading and validating configuration
//! for the API gateway, the article search client and the diagnostic
//! recorder, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::diagnostics::DEFAULT_CAPACITY;
use crate::error::{Result, ServiceError};

/// Default address of the track API when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default address of the article search provider
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://en.wikipedia.org";

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    /// Get a boolean configuration value with a default
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "API", "SEARCH")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub(crate) fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        // Uppercase, with anything non-alphanumeric turned into underscores
        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        match env::var(&env_key) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            Ok(_) | Err(env::VarError::NotPresent) => Err(ServiceError::configuration(format!(
                "Environment variable not set: {}",
                env_key
            ))),
            Err(env::VarError::NotUnicode(_)) => Err(ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            ))),
        }
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!("Configuration key not found in any provider: {}", key))
            })
    }
}

/// Global default configuration provider
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("TRACKS")));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

fn validate_base_url(service: &str, base_url: &str) -> Result<()> {
    if base_url.is_empty() {
        return Err(ServiceError::configuration(format!("{} base URL is required", service)));
    }

    let url = Url::parse(base_url)
        .map_err(|e| ServiceError::configuration(format!("Invalid {} base URL {}: {}", service, base_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ServiceError::configuration(format!(
            "Unsupported {} base URL scheme: {}",
            service, other
        ))),
    }
}

/// Configuration for the remote track API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address; request paths are appended to it
    pub base_url: String,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ApiConfig {
    /// Load configuration from a config provider
    ///
    /// An unset base address falls back to [`DEFAULT_API_BASE_URL`].
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let base_url = provider.get_string_or("api_base_url", DEFAULT_API_BASE_URL);
        let timeout_seconds = provider.get_int_or("api_timeout_seconds", 30).max(1) as u64;

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for ApiConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(ServiceError::configuration("API timeout must be at least one second"));
        }
        validate_base_url("API", &self.base_url)
    }

    fn service_name(&self) -> &str {
        "tracks"
    }
}

/// Configuration for the diagnostic recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Maximum number of buffered events
    pub capacity: usize,

    /// Mirror events to the `log` facade
    pub echo: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            echo: cfg!(debug_assertions),
        }
    }
}

impl DiagnosticsConfig {
    /// Load configuration from a config provider
    ///
    /// Never fails: malformed values fall back to the defaults, so the
    /// recorder is always available. A capacity below one counts as
    /// malformed.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        let defaults = Self::default();
        let capacity = provider
            .get_int("diagnostics_capacity")
            .ok()
            .and_then(|c| usize::try_from(c).ok())
            .filter(|c| *c > 0)
            .unwrap_or(defaults.capacity);

        Self {
            capacity,
            echo: provider.get_bool_or("diagnostics_echo", defaults.echo),
        }
    }
}

impl ServiceConfig for DiagnosticsConfig {
    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ServiceError::configuration("Diagnostics capacity must be at least one"));
        }
        Ok(())
    }

    fn service_name(&self) -> &str {
        "diagnostics"
    }
}

/// Configuration for the external article search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSearchConfig {
    /// Base address of the encyclopedia
    pub base_url: String,

    /// Maximum number of results per search
    pub result_limit: u32,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ArticleSearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            result_limit: 8,
            timeout_seconds: 10,
        }
    }
}

impl ArticleSearchConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let base_url = provider.get_string_or("search_base_url", DEFAULT_SEARCH_BASE_URL);
        let result_limit = provider.get_int_or("search_result_limit", 8);
        let timeout_seconds = provider.get_int_or("search_timeout_seconds", 10).max(1) as u64;

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            result_limit: u32::try_from(result_limit)
                .map_err(|_| ServiceError::configuration(format!("Invalid search result limit: {}", result_limit)))?,
            timeout_seconds,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for ArticleSearchConfig {
    fn validate(&self) -> Result<()> {
        if self.result_limit == 0 {
            return Err(ServiceError::configuration("Search result limit must be positive"));
        }
        validate_base_url("search", &self.base_url)
    }

    fn service_name(&self) -> &str {
        "articles"
    }
}
