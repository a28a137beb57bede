//! HTTP middleware for authentication, rate limiting, and observability.
//!
//! - **Basic Authentication**: constant-time credential check
//! - **Rate Limiting**: fixed window per client network address
//! - **Client Address**: peer IP keying with trusted-proxy CIDR validation
//! - **Request ID**: generation, propagation and a per-request span
//!
//! # Architecture
//!
//! Router-wide layers run for every request. Auth and rate limiting are
//! route layers attached to `POST /examples` only:
//!
//! ```text
//! Request → Request ID → Trace → [POST /examples: Auth → Rate Limit] → Handler
//!                                                  ↓           ↓
//!                                             401 Unauth   429 Too Many
//! ```
//!
//! Auth runs before the limiter, so unauthenticated requests never consume
//! a client's window.

pub mod auth;
pub mod client_addr;
pub mod rate_limit;
pub mod request_id;

pub use auth::{BasicAuthLayer, Credentials};
pub use client_addr::{CidrRange, TrustedProxyConfig, UNKNOWN_CLIENT, client_key};
pub use rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimitError, RateLimitLayer};
pub use request_id::{REQUEST_ID_HEADER, RequestIdExt, RequestIdLayer};
