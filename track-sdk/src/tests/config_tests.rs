//! Tests for configuration management functionality
//!
//! These tests verify that the configuration providers and the per-service
//! configurations load and validate correctly.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env;

    use crate::config::{
        ApiConfig, ArticleSearchConfig, CompositeConfigProvider, ConfigProvider, ConfigProviderExt,
        DiagnosticsConfig, EnvConfigProvider, MemoryConfigProvider, ServiceConfig, DEFAULT_API_BASE_URL,
    };
    use crate::diagnostics::{DiagnosticRecorder, DEFAULT_CAPACITY};
    use crate::error::ServiceError;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("api_base_url", "https://tracks.example.com");
        provider.set("api_timeout_seconds", "15");
        provider.set("diagnostics_echo", "yes");

        assert_eq!(provider.get_string("api_base_url").unwrap(), "https://tracks.example.com");
        assert_eq!(provider.get_int("api_timeout_seconds").unwrap(), 15);
        assert!(provider.get_bool("diagnostics_echo").unwrap());

        assert_eq!(provider.get_string_or("missing", "default"), "default");
        assert_eq!(provider.get_int_or("missing", 60), 60);
        assert!(!provider.get_bool_or("missing", false));

        assert!(provider.get_string("missing").is_err());
        assert!(provider.get_int("api_base_url").is_err());
    }

    #[test]
    fn test_env_config_provider() {
        env::set_var("TRACKSTEST_API_BASE_URL", "https://env.example.com");
        env::set_var("TRACKSTEST_API_TIMEOUT_SECONDS", "5");
        env::set_var("TRACKSTEST_API_BLANK", "  ");

        let provider = EnvConfigProvider::new().with_prefix("TRACKSTEST").with_namespace("API");

        assert_eq!(provider.format_key("base_url"), "TRACKSTEST_API_BASE_URL");
        assert_eq!(provider.get_string("base_url").unwrap(), "https://env.example.com");
        assert_eq!(provider.get_int("timeout_seconds").unwrap(), 5);
        assert!(provider.get_string("blank").is_err());
        assert!(provider.get_string("missing").is_err());

        env::remove_var("TRACKSTEST_API_BASE_URL");
        env::remove_var("TRACKSTEST_API_TIMEOUT_SECONDS");
        env::remove_var("TRACKSTEST_API_BLANK");
    }

    #[test]
    fn test_composite_config_provider() {
        let mut primary = MemoryConfigProvider::new();
        primary.set("search_result_limit", "3");

        let mut fallback = HashMap::new();
        fallback.insert("search_result_limit".to_string(), "20".to_string());
        fallback.insert("search_base_url".to_string(), "https://wiki.example.org".to_string());

        let mut composite = CompositeConfigProvider::new();
        composite.add_provider(primary);
        composite.add_provider(MemoryConfigProvider::with_values(fallback));

        assert_eq!(composite.get_int("search_result_limit").unwrap(), 3);
        assert_eq!(composite.get_string("search_base_url").unwrap(), "https://wiki.example.org");
        assert!(composite.get_string("missing").is_err());
    }

    #[test]
    fn test_api_config_defaults_and_overrides() {
        let config = ApiConfig::from_provider(&MemoryConfigProvider::new()).unwrap();
        assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout_seconds, 30);

        let mut provider = MemoryConfigProvider::new();
        provider.set("api_base_url", "https://tracks.example.com/");
        provider.set("api_timeout_seconds", "0");
        let config = ApiConfig::from_provider(&provider).unwrap();
        assert_eq!(config.base_url, "https://tracks.example.com");
        assert_eq!(config.timeout_seconds, 1);
        assert_eq!(config.service_name(), "tracks");
    }

    #[test]
    fn test_api_config_rejects_bad_base_url() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("api_base_url", "ftp://tracks.example.com");
        let err = ApiConfig::from_provider(&provider).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));

        provider.set("api_base_url", "not a url");
        assert!(ApiConfig::from_provider(&provider).is_err());
    }

    #[test]
    fn test_diagnostics_config_never_fails() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("diagnostics_capacity", "-4");
        provider.set("diagnostics_echo", "sometimes");

        let config = DiagnosticsConfig::from_provider(&provider);
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.echo, DiagnosticsConfig::default().echo);

        provider.set("diagnostics_capacity", "0");
        let config = DiagnosticsConfig::from_provider(&provider);
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert!(config.validate().is_ok());

        let recorder = DiagnosticRecorder::from_config(&config);
        recorder.info("kept", None);
        assert_eq!(recorder.recent(10).len(), 1);

        let zero = DiagnosticsConfig {
            capacity: 0,
            echo: false,
        };
        assert!(matches!(zero.validate(), Err(ServiceError::Configuration(_))));

        provider.set("diagnostics_capacity", "250");
        provider.set("diagnostics_echo", "off");
        let config = DiagnosticsConfig::from_provider(&provider);
        assert_eq!(config.capacity, 250);
        assert!(!config.echo);
    }

    #[test]
    fn test_article_search_config() {
        let config = ArticleSearchConfig::from_provider(&MemoryConfigProvider::new()).unwrap();
        assert_eq!(config.base_url, "https://en.wikipedia.org");
        assert_eq!(config.result_limit, 8);

        let mut provider = MemoryConfigProvider::new();
        provider.set("search_result_limit", "0");
        assert!(ArticleSearchConfig::from_provider(&provider).is_err());

        provider.set("search_result_limit", "-1");
        assert!(ArticleSearchConfig::from_provider(&provider).is_err());
    }
}
