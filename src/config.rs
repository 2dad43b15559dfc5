//! Configuration types for reddit-top

use crate::error::{Error, Result};
use crate::types::ListingKind;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Largest page Reddit serves for a listing request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Largest accepted `retry.backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// Listing endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedditConfig {
    /// Base URL of the Reddit JSON API (default: "https://www.reddit.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Which listing to browse (default: top)
    #[serde(default)]
    pub listing: ListingKind,

    /// Posts requested per page (default: 50, max: 100)
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Timeout for a single listing request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            listing: ListingKind::default(),
            page_limit: default_page_limit(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Thumbnail loading configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Maximum number of decoded images kept in memory (default: 200)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Timeout for a single image download (default: 15 seconds)
    #[serde(default = "default_image_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            request_timeout: default_image_timeout(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./reddit-top.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Retry configuration for transient listing failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration
///
/// Every section has defaults, so `Config::default()` is a working setup and
/// a JSON document only needs the keys it wants to override.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing endpoint settings
    #[serde(default)]
    pub reddit: RedditConfig,

    /// Thumbnail loading settings
    #[serde(default)]
    pub images: ImageConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Retry policy for listing requests
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Parse a JSON configuration document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.reddit.base_url)
            .map_err(|e| Error::config(format!("invalid base URL: {e}"), "reddit.base_url"))?;

        if self.reddit.page_limit == 0 || self.reddit.page_limit > MAX_PAGE_LIMIT {
            return Err(Error::config(
                format!("must be between 1 and {MAX_PAGE_LIMIT}"),
                "reddit.page_limit",
            ));
        }

        if self.reddit.user_agent.trim().is_empty() {
            return Err(Error::config("must not be empty", "reddit.user_agent"));
        }

        if self.images.cache_capacity == 0 {
            return Err(Error::config("must be at least 1", "images.cache_capacity"));
        }

        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.retry.backoff_multiplier) {
            return Err(Error::config(
                format!("must be between 1.0 and {MAX_BACKOFF_MULTIPLIER}"),
                "retry.backoff_multiplier",
            ));
        }

        if self.retry.initial_delay > self.retry.max_delay {
            return Err(Error::config(
                "must not exceed retry.max_delay",
                "retry.initial_delay",
            ));
        }

        Ok(())
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://www.reddit.com".into()
}

fn default_user_agent() -> String {
    concat!("reddit-top/", env!("CARGO_PKG_VERSION")).into()
}

fn default_page_limit() -> u32 {
    50
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_capacity() -> usize {
    200
}

fn default_image_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("reddit-top.db")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
