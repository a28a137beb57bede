//! Shared application state for Axum handlers.
//!
//! Holds the injected storage boundaries, the configuration and the shared
//! rate limiter. Everything is behind `Arc`, so cloning per request is cheap.
//!
//! # Structured Concurrency
//!
//! Two housekeeping tasks run for the life of the state:
//!
//! - rate-limit sweep: evicts windows that have fully elapsed
//! - cache sweep: purges expired cache entries (only when a cache is attached)
//!
//! Both are tracked by a `TaskTracker` and stop on a shared
//! `CancellationToken`. Call [`AppState::shutdown`] before exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::cache::{CacheClient, MemoryCache};
use crate::config::Config;
use crate::middleware::{FixedWindowLimiter, RateLimitError};
use crate::repository::{ExampleRepository, InMemoryExampleRepository};

/// Shared application state for Axum handlers.
///
/// # Lifecycle
///
/// ```rust,ignore
/// let state = AppState::new(config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Persistence for examples
    pub repository: Arc<dyn ExampleRepository>,
    /// Optional key-value cache
    pub cache: Option<Arc<dyn CacheClient>>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Fixed-window limiter shared with the rate-limit layer
    pub rate_limiter: Arc<FixedWindowLimiter>,
    /// Timestamp when the state was built
    pub started_at: Instant,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Build state with the in-process repository and, if enabled, the
    /// in-process cache.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError` if the configured limit or window is zero.
    pub fn new(config: Config) -> Result<Self, RateLimitError> {
        let repository: Arc<dyn ExampleRepository> = Arc::new(InMemoryExampleRepository::new());
        let cache: Option<Arc<dyn CacheClient>> = if config.cache_enabled {
            Some(Arc::new(MemoryCache::new()))
        } else {
            None
        };

        Self::with_dependencies(config, repository, cache)
    }

    /// Build state around caller-supplied storage implementations.
    ///
    /// Must be called inside a Tokio runtime; the housekeeping tasks are
    /// spawned immediately.
    pub fn with_dependencies(
        config: Config,
        repository: Arc<dyn ExampleRepository>,
        cache: Option<Arc<dyn CacheClient>>,
    ) -> Result<Self, RateLimitError> {
        let rate_limiter = Arc::new(FixedWindowLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        )?);

        let state = Self {
            repository,
            cache,
            config: Arc::new(config),
            rate_limiter,
            started_at: Instant::now(),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_rate_limit_sweep_task();
        if let Some(cache) = &state.cache {
            state.spawn_cache_sweep_task(cache.clone());
        }

        Ok(state)
    }

    /// Evict elapsed rate-limit windows on a timer.
    fn spawn_rate_limit_sweep_task(&self) {
        let limiter = self.rate_limiter.clone();
        let period = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limit sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.sweep_expired();
                        trace!(removed, tracked = limiter.tracked_keys(), "Rate limit sweep");
                    }
                }
            }

            debug!("Rate limit sweep task shutting down");
        });
    }

    fn spawn_cache_sweep_task(&self, cache: Arc<dyn CacheClient>) {
        let period = self.config.cache_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Cache sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        trace!(removed, "Cache sweep");
                    }
                }
            }

            debug!("Cache sweep task shutting down");
        });
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn fast_sweep_config() -> Config {
        Config {
            rate_limit_max_requests: 1,
            rate_limit_window: Duration::from_millis(10),
            rate_limit_sweep_interval: Duration::from_millis(20),
            cache_sweep_interval: Duration::from_millis(20),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_new_attaches_cache_when_enabled() {
        let state = AppState::new(Config {
            cache_enabled: true,
            ..Config::default()
        })
        .unwrap();
        assert!(state.cache.is_some());
        state.shutdown().await;

        let state = AppState::new(Config {
            cache_enabled: false,
            ..Config::default()
        })
        .unwrap();
        assert!(state.cache.is_none());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejects_zero_rate_limit() {
        let result = AppState::new(Config {
            rate_limit_max_requests: 0,
            ..Config::default()
        });
        assert_eq!(result.err(), Some(RateLimitError::ZeroMaxRequests));
    }

    #[tokio::test]
    async fn test_sweep_task_evicts_elapsed_windows() {
        let state = AppState::new(fast_sweep_config()).unwrap();
        state.rate_limiter.check("198.51.100.1");
        assert_eq!(state.rate_limiter.tracked_keys(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(state.rate_limiter.tracked_keys(), 0);
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_cache_sweep_task_purges_expired() {
        let cache = Arc::new(MemoryCache::new());
        let state = AppState::with_dependencies(
            fast_sweep_config(),
            Arc::new(InMemoryExampleRepository::new()),
            Some(cache.clone() as Arc<dyn CacheClient>),
        )
        .unwrap();

        cache.set("k", "v", Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.is_empty());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_completes() {
        let state = AppState::new(Config::default()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), state.shutdown())
            .await
            .expect("shutdown should not hang");
    }
}
