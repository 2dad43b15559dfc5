//! Reddit listing client
//!
//! Fetches one page of the "top" or "new" listing as JSON and decodes it into
//! [`Page`]. Pagination uses Reddit's `after` cursor.

use crate::config::{Config, RedditConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::{ListingKind, Page};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Source of listing pages
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// Fetch up to `limit` posts of `kind`, starting after `after` (first page when `None`)
    async fn fetch_page(&self, kind: ListingKind, limit: u32, after: Option<&str>) -> Result<Page>;
}

/// [`ListingClient`] talking to the Reddit JSON API
pub struct RedditClient {
    http_client: reqwest::Client,
    base_url: url::Url,
    retry: RetryConfig,
}

impl RedditClient {
    /// Create a client from the `reddit` and `retry` sections of `config`
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_settings(&config.reddit, config.retry.clone())
    }

    /// Create a client from explicit settings
    pub fn with_settings(reddit: &RedditConfig, retry: RetryConfig) -> Result<Self> {
        let base_url = url::Url::parse(&reddit.base_url)
            .map_err(|e| Error::config(format!("invalid base URL: {}", e), "reddit.base_url"))?;

        let http_client = reqwest::Client::builder()
            .timeout(reddit.request_timeout)
            .user_agent(reddit.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            retry,
        })
    }

    /// URL of one listing page
    pub fn page_url(&self, kind: ListingKind, limit: u32, after: Option<&str>) -> Result<url::Url> {
        let mut url = self
            .base_url
            .join(kind.path())
            .map_err(|e| Error::config(format!("invalid base URL: {}", e), "reddit.base_url"))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(after) = after {
                query.append_pair("after", after);
            }
            query.append_pair("raw_json", "1");
        }

        Ok(url)
    }

    async fn fetch_once(&self, url: &url::Url) -> Result<Page> {
        let response = self.http_client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after: retry_after(response.headers()),
            });
        }

        let body = response.bytes().await?;
        Ok(Page::from_json(&body)?)
    }
}

/// Wait requested by a throttling response
///
/// Reads `Retry-After` in its delay-seconds form, then Reddit's own
/// `X-Ratelimit-Reset` (seconds until the rate-limit window resets).
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    [reqwest::header::RETRY_AFTER.as_str(), "x-ratelimit-reset"]
        .into_iter()
        .find_map(|name| headers.get(name)?.to_str().ok()?.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

#[async_trait]
impl ListingClient for RedditClient {
    async fn fetch_page(&self, kind: ListingKind, limit: u32, after: Option<&str>) -> Result<Page> {
        let url = self.page_url(kind, limit, after)?;
        debug!(%url, "fetching listing page");

        let page = with_retry(&self.retry, || self.fetch_once(&url)).await?;

        info!(
            listing = %kind,
            posts = page.posts.len(),
            has_more = page.after.is_some(),
            "fetched listing page"
        );
        Ok(page)
    }
}
