//! # gobo
//!
//! A small CRUD service over an `Example` entity, built on Axum, where the
//! interesting part is the request pipeline in front of the handlers:
//!
//! - **Security**: HTTP Basic authentication with constant-time comparison
//! - **Abuse control**: fixed-window rate limiting per client address
//! - **Observability**: request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Router-wide: Request ID → Trace → Body limit               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  POST /examples: Basic Auth → Fixed-window Rate Limit       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (root, list_examples, create_example, not_found)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ExampleRepository / CacheClient (injected via AppState)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use gobo::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config.clone())?;
//!     let app = build_router(state.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!
//!     state.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```bash
//! BASIC_AUTH_USERNAME=admin BASIC_AUTH_PASSWORD=secret \
//! RATE_LIMIT_MAX_REQUESTS=10 RATE_LIMIT_WINDOW_MS=1000 cargo run
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use cache::{CacheClient, MemoryCache};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use repository::{ExampleRepository, InMemoryExampleRepository};
pub use routes::build_router;
pub use state::AppState;
