use axum::http::Uri;
use tracing::instrument;

use crate::error::AppError;

/// Plain-text greeting served at `/`.
pub const GREETING: &str = "Hello, World!";

#[instrument]
pub async fn root() -> &'static str {
    GREETING
}

/// Fallback for unknown paths and unregistered methods.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
