//! Utility module for common functionality
//!
//! This module provides common utility functions used across the Track SDK.

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Bearer [A-Za-z0-9\-_\.=]+", "Bearer [REDACTED]"),
        (r"(?i)access[_-]?token[=:]\s*[^\s&]+", "access_token=[REDACTED]"),
        (r"(?i)refresh[_-]?token[=:]\s*[^\s&]+", "refresh_token=[REDACTED]"),
        (r"(?i)password[=:]\s*[^\s&]+", "password=[REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

static HTML_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]*>").ok());

/// Sanitize a string for logging (remove credential patterns)
pub fn sanitize_for_logging(s: &str) -> String {
    let mut result = s.to_string();
    for (re, replacement) in SENSITIVE_PATTERNS.iter() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

/// Remove HTML tags, keeping their text content
pub fn strip_html_tags(s: &str) -> String {
    match HTML_TAG.as_ref() {
        Some(re) => re.replace_all(s, "").into_owned(),
        None => s.to_string(),
    }
}

/// Generate a short correlation id for one logical call
pub fn generate_correlation_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
