//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_API_URL` - Base URL of the storefront backend API
//!
//! ## Optional
//! - `SHOPFRONT_CACHE_PATH` - `SQLite` file for the local product cache
//!   (default: shopfront-cache.sqlite; `:memory:` keeps it in memory)
//! - `SHOPFRONT_SNAPSHOT_DIR` - Directory for user/cart/wishlist snapshots (default: .shopfront)
//! - `SHOPFRONT_SEARCH_DEBOUNCE_MS` - Search input debounce delay (default: 300)
//! - `SHOPFRONT_QUERY_TTL_SECS` - Lifetime of cached query results (default: 300)
//! - `SHOPFRONT_QUERY_STALE_SECS` - Age after which cached results revalidate (default: 60)
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 15)
//! - `SHOPFRONT_REVALIDATE_CATALOG` - Refresh the cached catalog in the background
//!   after serving it (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_CACHE_PATH: &str = "shopfront-cache.sqlite";
const DEFAULT_SNAPSHOT_DIR: &str = ".shopfront";
const MEMORY_CACHE: &str = ":memory:";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the backend REST API
    pub api_url: Url,
    /// Local product cache file; `None` keeps the cache in memory
    pub cache_path: Option<PathBuf>,
    /// Snapshot directory; `None` disables snapshot persistence
    pub snapshot_dir: Option<PathBuf>,
    /// Quiet period before search text is sent
    pub search_debounce: Duration,
    /// Lifetime of cached query results
    pub query_ttl: Duration,
    /// Age after which a cached query result is revalidated in the background
    pub query_stale_after: Duration,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// Revalidate the cached catalog in the background after publishing it
    pub revalidate_catalog: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Configuration for `api_url` with an in-memory cache, no snapshot
    /// persistence and default timings.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            cache_path: None,
            snapshot_dir: None,
            search_debounce: Duration::from_millis(300),
            query_ttl: Duration::from_secs(300),
            query_stale_after: Duration::from_secs(60),
            request_timeout: Duration::from_secs(15),
            revalidate_catalog: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = get("SHOPFRONT_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("SHOPFRONT_API_URL".to_string()))?;
        let api_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPFRONT_API_URL".to_string(), e.to_string())
        })?;

        let cache_path = match get("SHOPFRONT_CACHE_PATH").as_deref() {
            Some(MEMORY_CACHE) => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_CACHE_PATH)),
        };
        let snapshot_dir = Some(PathBuf::from(
            get("SHOPFRONT_SNAPSHOT_DIR").unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.to_string()),
        ));

        let defaults = Self::new(api_url);
        Ok(Self {
            cache_path,
            snapshot_dir,
            search_debounce: Duration::from_millis(parse_or(
                &get,
                "SHOPFRONT_SEARCH_DEBOUNCE_MS",
                300,
            )?),
            query_ttl: Duration::from_secs(parse_or(&get, "SHOPFRONT_QUERY_TTL_SECS", 300)?),
            query_stale_after: Duration::from_secs(parse_or(
                &get,
                "SHOPFRONT_QUERY_STALE_SECS",
                60,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "SHOPFRONT_REQUEST_TIMEOUT_SECS",
                15,
            )?),
            revalidate_catalog: parse_or(&get, "SHOPFRONT_REVALIDATE_CATALOG", false)?,
            sentry_dsn: get("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
            ..defaults
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(get: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
