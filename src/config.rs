//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `BASIC_AUTH_USERNAME` / `BASIC_AUTH_PASSWORD`: credentials required on protected routes
//! - `TRUSTED_PROXIES`: CIDR ranges whose forwarding headers are believed
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_MAX_REQUESTS`: requests allowed per client per window (default: 10)
//! - `RATE_LIMIT_WINDOW_MS`: fixed window length in milliseconds (default: 1000)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Deployment environment, selects the log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Human-readable logs, debug level by default.
    Development,
    /// JSON logs, info level by default.
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{other}' (expected 'development' or 'production')"
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 64KB)
    pub max_request_body_size: usize,

    // =========================================================================
    // Authentication
    // =========================================================================
    /// Username expected in Basic credentials (default: "admin")
    pub auth_username: String,

    /// Password expected in Basic credentials (default: "password")
    pub auth_password: String,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Requests allowed per client within one window (default: 10)
    pub rate_limit_max_requests: u32,

    /// Fixed window length (default: 1 second)
    pub rate_limit_window: Duration,

    /// How often elapsed windows are evicted from memory (default: 60 seconds)
    pub rate_limit_sweep_interval: Duration,

    /// Trusted proxy CIDR ranges.
    ///
    /// Forwarding headers are only honoured when the connecting peer is in
    /// one of these networks. Empty means the peer address is always the key.
    pub trusted_proxies: Vec<String>,

    // =========================================================================
    // Cache
    // =========================================================================
    /// Whether the in-memory cache is attached to the application state
    pub cache_enabled: bool,

    /// How often expired cache entries are purged (default: 30 seconds)
    pub cache_sweep_interval: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Deployment environment (default: production)
    pub environment: Environment,

    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_request_body_size", &self.max_request_body_size)
            .field("auth_username", &self.auth_username)
            .field("auth_password", &"<redacted>")
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_sweep_interval", &self.rate_limit_sweep_interval)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_sweep_interval", &self.cache_sweep_interval)
            .field("environment", &self.environment)
            .field("log_level", &self.log_level)
            .field("metrics_port", &self.metrics_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or(defaults.host),
            port: Self::parse_env("PORT", defaults.port)?,
            max_request_body_size: Self::parse_env(
                "MAX_REQUEST_BODY_SIZE",
                defaults.max_request_body_size,
            )?,

            // Authentication
            auth_username: env::var("BASIC_AUTH_USERNAME").unwrap_or(defaults.auth_username),
            auth_password: env::var("BASIC_AUTH_PASSWORD").unwrap_or(defaults.auth_password),

            // Rate limiting
            rate_limit_max_requests: Self::parse_env(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            )?,
            rate_limit_window: Duration::from_millis(Self::parse_env(
                "RATE_LIMIT_WINDOW_MS",
                1000,
            )?),
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                60,
            )?),
            trusted_proxies: Self::parse_list("TRUSTED_PROXIES"),

            // Cache
            cache_enabled: Self::parse_env("CACHE_ENABLED", defaults.cache_enabled)?,
            cache_sweep_interval: Duration::from_secs(Self::parse_env(
                "CACHE_SWEEP_INTERVAL_SECS",
                30,
            )?),

            // Observability
            environment: Self::parse_env("APP_ENV", defaults.environment)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            metrics_port: Self::parse_env("METRICS_PORT", defaults.metrics_port)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.auth_username.is_empty() || self.auth_password.is_empty() {
            return Err(AppError::ConfigError(
                "BASIC_AUTH_USERNAME and BASIC_AUTH_PASSWORD must not be empty".to_string(),
            ));
        }

        // A username containing ':' could never be matched after splitting on the first colon.
        if self.auth_username.contains(':') {
            return Err(AppError::ConfigError(
                "BASIC_AUTH_USERNAME must not contain ':'".to_string(),
            ));
        }

        if self.rate_limit_max_requests == 0 {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_MAX_REQUESTS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_MS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.cache_sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "CACHE_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated list, dropping empty items.
    fn parse_list(name: &str) -> Vec<String> {
        env::var(name)
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_size: 64 * 1024,
            auth_username: "admin".to_string(),
            auth_password: "password".to_string(),
            rate_limit_max_requests: 10,
            rate_limit_window: Duration::from_secs(1),
            rate_limit_sweep_interval: Duration::from_secs(60),
            trusted_proxies: vec![],
            cache_enabled: true,
            cache_sweep_interval: Duration::from_secs(30),
            environment: Environment::Production,
            log_level: "info".to_string(),
            metrics_port: 0,
        }
    }
}
