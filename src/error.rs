use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::header::{HeaderValue, RETRY_AFTER, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Challenge sent with every 401 so clients know which scheme is expected.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="gobo", charset="UTF-8""#;

/// Header carrying the configured request ceiling on 429 responses.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Header carrying the remaining request budget on 429 responses.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Why a Basic authentication check failed.
///
/// Only the header *shape* is distinguished in responses. A username mismatch
/// and a password mismatch both collapse into [`AuthFailure::InvalidCredentials`]
/// so that callers cannot probe which half was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header, or a scheme other than `Basic`.
    MissingCredentials,
    /// Payload is not base64 or has no `:` separator.
    MalformedHeader,
    /// Well-formed credentials that do not match the configured pair.
    InvalidCredentials,
}

impl AuthFailure {
    /// Client-facing message for this failure.
    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::MissingCredentials => "Unauthorized",
            AuthFailure::MalformedHeader => "Invalid authorization header",
            AuthFailure::InvalidCredentials => "Invalid credentials",
        }
    }

    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            AuthFailure::MissingCredentials => "missing_credentials",
            AuthFailure::MalformedHeader => "malformed_header",
            AuthFailure::InvalidCredentials => "invalid_credentials",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage call that failed, used to pick the generic client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    FetchExamples,
    CreateExample,
    Cache,
}

impl StorageOperation {
    fn public_message(self) -> &'static str {
        match self {
            StorageOperation::FetchExamples => "Failed to fetch examples",
            StorageOperation::CreateExample => "Failed to create example",
            StorageOperation::Cache => "Cache operation failed",
        }
    }

    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageOperation::FetchExamples => "fetch_examples",
            StorageOperation::CreateExample => "create_example",
            StorageOperation::Cache => "cache",
        }
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide error types with appropriate HTTP status codes.
///
/// Middleware and handlers both terminate a request by converting one of
/// these into a response, so every failure body has the same
/// `{"error": "..."}` shape.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Unauthenticated(AuthFailure),

    #[error("Rate limit exceeded (limit {limit}, retry after {retry_after_secs}s)")]
    RateLimited { limit: u32, retry_after_secs: u64 },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage operation {operation} failed: {detail}")]
    StorageUnavailable {
        operation: StorageOperation,
        detail: String,
    },

    #[error("No route for {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a repository or cache failure, keeping the detail for the log only.
    pub fn storage(operation: StorageOperation, err: impl fmt::Display) -> Self {
        AppError::StorageUnavailable {
            operation,
            detail: err.to_string(),
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageUnavailable { .. }
            | AppError::ConfigError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body for API endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Full detail stays server-side; clients only get the sanitized message.
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = match &self {
            AppError::Unauthenticated(failure) => failure.message().to_string(),
            AppError::RateLimited { .. } => "Rate limit exceeded. Try again later.".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(_) => "Not found".to_string(),
            AppError::StorageUnavailable { operation, .. } => {
                operation.public_message().to_string()
            }
            AppError::ConfigError(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        };

        let mut response = (status, axum::Json(ErrorResponse { error: message })).into_response();

        match &self {
            AppError::Unauthenticated(_) => {
                response.headers_mut().insert(
                    WWW_AUTHENTICATE,
                    HeaderValue::from_static(BASIC_CHALLENGE),
                );
            }
            AppError::RateLimited {
                limit,
                retry_after_secs,
            } => {
                let headers = response.headers_mut();
                headers.insert(RETRY_AFTER, HeaderValue::from(*retry_after_secs));
                headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(*limit));
                headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from_static("0"));
            }
            _ => {}
        }

        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(describe_json_rejection(&rejection))
    }
}

/// Turn a body rejection into a message that is safe to show to clients.
///
/// Serde messages can mention internal type names, so only the field name
/// of a missing field is echoed back.
fn describe_json_rejection(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".to_string(),
        JsonRejection::JsonDataError(err) => {
            let msg = err.body_text();
            if msg.contains("missing field")
                && let Some(start) = msg.find('`')
                && let Some(end) = msg[start + 1..].find('`')
            {
                let field = &msg[start + 1..start + 1 + end];
                return format!("Missing required field: {field}");
            }
            if msg.contains("invalid type") {
                return "Invalid data type in request body".to_string();
            }
            "Invalid request body".to_string()
        }
        JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
        _ => "Invalid request body".to_string(),
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
