//! Fixed-window rate limiting keyed by client network address.
//!
//! # Algorithm
//!
//! Each key owns a window `{count, window_start}`. A request either opens a
//! fresh window (no record yet, or the previous window has fully elapsed)
//! with a count of one, or increments the count of the current window. Once
//! the count passes the configured ceiling the request is rejected with 429
//! until the window elapses.
//!
//! Windows are not sliding: a client may send a full window's worth at the
//! end of one window and another full window's worth right after it resets.
//!
//! The check-and-increment for one key runs under that key's shard lock, so
//! concurrent requests from the same address can never overshoot the ceiling.
//!
//! # Response Headers
//!
//! - allowed: `X-RateLimit-Limit` and `X-RateLimit-Remaining`
//! - rejected: the above plus `Retry-After` in whole seconds (at least one)
//!
//! # Memory
//!
//! Idle windows are removed by [`FixedWindowLimiter::sweep_expired`], which
//! the application state runs on a timer.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::{debug, trace, warn};

use super::client_addr::{TrustedProxyConfig, client_key};
use crate::error::{AppError, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER};
use crate::metrics;

/// Error type for rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// The request ceiling cannot be zero.
    ZeroMaxRequests,
    /// The window length cannot be zero.
    ZeroWindow,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroMaxRequests => {
                write!(f, "rate limit max requests must be greater than 0")
            }
            RateLimitError::ZeroWindow => write!(f, "rate limit window must be greater than 0"),
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Outcome of a single limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Round a wait up to whole seconds, never below one.
pub fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Shared table of per-key fixed windows.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    windows: DashMap<String, WindowState>,
    max_requests: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    /// Create a limiter allowing `max_requests` per `window` for each key.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        if max_requests == 0 {
            return Err(RateLimitError::ZeroMaxRequests);
        }
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }

        Ok(Self {
            windows: DashMap::new(),
            max_requests,
            window,
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of keys currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Record one request for `key` and decide whether it may proceed.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut state = self
            .windows
            .entry(key.to_owned())
            .or_insert(WindowState {
                count: 0,
                window_start: now,
            });

        let elapsed = now.saturating_duration_since(state.window_start);
        if state.count == 0 || elapsed >= self.window {
            state.count = 1;
            state.window_start = now;
            return RateLimitDecision::Allowed {
                remaining: self.max_requests - 1,
            };
        }

        state.count = state.count.saturating_add(1);
        if state.count > self.max_requests {
            RateLimitDecision::Limited {
                retry_after: self.window - elapsed,
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.max_requests - state.count,
            }
        }
    }

    /// Drop every window that has fully elapsed, returning how many were removed.
    ///
    /// A removed key behaves exactly like one whose window elapsed, so this
    /// never changes a decision.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, state| now.saturating_duration_since(state.window_start) < self.window);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            trace!(removed, remaining = self.windows.len(), "Swept expired rate limit windows");
        }
        removed
    }
}

/// Rate limiting layer for Tower middleware stack.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<FixedWindowLimiter>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl RateLimitLayer {
    /// Create a layer with its own limiter and no trusted proxies.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        Ok(Self::from_shared(
            Arc::new(FixedWindowLimiter::new(max_requests, window)?),
            TrustedProxyConfig::default(),
        ))
    }

    /// Wrap an existing limiter, typically the one owned by application state.
    pub fn from_shared(limiter: Arc<FixedWindowLimiter>, trusted_proxies: TrustedProxyConfig) -> Self {
        if trusted_proxies.is_enabled() {
            debug!("Rate limiter honours forwarding headers from trusted proxies");
        }

        Self {
            limiter,
            trusted_proxies: Arc::new(trusted_proxies),
        }
    }

    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<FixedWindowLimiter>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let key: Cow<'static, str> = client_key(&req, &self.trusted_proxies);
        let decision = self.limiter.check(&key);
        let limit = self.limiter.max_requests();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match decision {
                RateLimitDecision::Allowed { remaining } => {
                    let mut response = inner.call(req).await?;
                    let headers = response.headers_mut();
                    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
                    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
                    Ok(response)
                }
                RateLimitDecision::Limited { retry_after } => {
                    let retry_after_secs = retry_after_secs(retry_after);
                    warn!(
                        client = %key,
                        path = %req.uri().path(),
                        retry_after_secs,
                        "Rate limit exceeded"
                    );
                    metrics::record_rate_limited();

                    Ok(AppError::RateLimited {
                        limit,
                        retry_after_secs,
                    }
                    .into_response())
                }
            }
        })
    }
}
