//! Tracing subscriber setup.
//!
//! `development` renders human-readable lines with targets and thread ids;
//! `production` emits one JSON object per event. `RUST_LOG` always wins over
//! the configured level.

use tracing_subscriber::EnvFilter;

use crate::config::{Config, Environment};
use crate::error::{AppError, AppResult};

/// Logging settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub environment: Environment,
    pub level: String,
}

impl LogConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            environment: config.environment,
            level: config.log_level.clone(),
        }
    }

    /// Build the filter: `RUST_LOG` if set and valid, else the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            level: "info".to_string(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if a global subscriber is already set.
pub fn init_tracing(log: &LogConfig) -> AppResult<()> {
    let result = match log.environment {
        Environment::Development => tracing_subscriber::fmt()
            .with_env_filter(log.env_filter())
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        Environment::Production => tracing_subscriber::fmt()
            .json()
            .with_env_filter(log.env_filter())
            .with_current_span(true)
            .try_init(),
    };

    result.map_err(|e| AppError::ConfigError(format!("Failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_from_config() {
        let config = Config {
            environment: Environment::Development,
            log_level: "debug".to_string(),
            ..Config::default()
        };

        let log = LogConfig::from_config(&config);
        assert_eq!(log.environment, Environment::Development);
        assert_eq!(log.level, "debug");
    }

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let log = LogConfig::default();
        let _ = init_tracing(&log);

        // Whichever call installed the subscriber, the next one must fail cleanly.
        assert!(init_tracing(&log).is_err());
    }
}
