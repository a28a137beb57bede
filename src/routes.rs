//! Route table and middleware binding.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← X-Request-Id + request span + duration metric
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Body Limit     │ ← oversize bodies become a 400 in the JSON extractor
//! └────────┬─────────┘
//!          ▼
//!   POST /examples only:
//! ┌──────────────────┐
//! │  Authentication  │ ← 401 if missing, malformed or wrong
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 once the client's window is full
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `GET /` - plain-text greeting
//! - `GET /examples` - list examples (public)
//! - `POST /examples` - create an example (protected)
//!
//! Anything else, including an unregistered method on `/examples`, is a
//! JSON 404 and never reaches the auth or rate-limit layers.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{
    BasicAuthLayer, Credentials, RateLimitLayer, RequestIdLayer, TrustedProxyConfig,
};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The rate-limit layer shares `state.rate_limiter`, so the background sweep
/// in [`AppState`] sees the same windows the layer fills.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let credentials = Credentials::new(config.auth_username.clone(), config.auth_password.clone());
    let trusted_proxies = TrustedProxyConfig::new(&config.trusted_proxies);

    info!(
        max_requests = config.rate_limit_max_requests,
        window_ms = config.rate_limit_window.as_millis() as u64,
        trusted_proxies = config.trusted_proxies.len(),
        "Rate limiting enabled on protected routes"
    );

    // Auth is the outer layer: it runs first and rejected requests never
    // touch the limiter's counters.
    let protected = ServiceBuilder::new()
        .layer(BasicAuthLayer::new(credentials))
        .layer(RateLimitLayer::from_shared(
            state.rate_limiter.clone(),
            trusted_proxies,
        ));

    let examples = post(handlers::create_example)
        .route_layer(protected)
        .get(handlers::list_examples)
        .fallback(handlers::not_found);

    info!(
        max_size_kb = config.max_request_body_size / 1024,
        "Request body size limit configured"
    );

    Router::new()
        .route("/", get(handlers::root))
        .route("/examples", examples)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(config.max_request_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(RequestIdLayer::new())
        .with_state(state)
}
