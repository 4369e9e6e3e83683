//! Error mapping for non-2xx API responses
//!
//! The gateway hands every response back as data. Callers that want a domain
//! error use these helpers to turn a status code and body into a ServiceError.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};
use crate::core::ApiResponse;

/// Map a non-2xx response of an API operation to a ServiceError
///
/// `operation` names what the caller tried to do ("fetch tracks") and ends up
/// in the message as `Failed to <operation>: <reason>`.
pub fn map_response_error(operation: &str, response: &ApiResponse, context: ErrorContext) -> ServiceError {
    let context = context.status_code(response.status);
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let reason = extract_detail(&response.body).unwrap_or_else(|| response.reason.clone());
    let message = format!("Failed to {}: {}", operation, reason);

    map_http_error(status, message).with_context(context)
}

/// Map an HTTP status and a ready-made message to a ServiceError
pub fn map_http_error(status: StatusCode, message: impl Into<String>) -> ServiceError {
    let message = message.into();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::authentication(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::validation(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::api(status.as_u16(), message),
    }
}

/// Pull the human readable message out of an error body
///
/// The track API returns `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": "..."}]}` for request validation failures.
fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    match json.get("detail") {
        Some(Value::String(detail)) => Some(detail.clone()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
            .next()
            .map(str::to_string),
        _ => json
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: u16) -> &'static str {
    match status {
        400 | 422 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 | 504 => "timeout",
        500..=599 => "server",
        _ => "unknown",
    }
}
