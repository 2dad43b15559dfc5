//! The fetch primitive the image service sits on

use super::Cancellable;
use crate::config::ImageConfig;
use crate::error::{Error, FetchError, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Raw bytes or the reason they could not be fetched
pub type FetchResult = std::result::Result<Vec<u8>, FetchError>;

/// Completion callback handed to a [`Fetcher`]
pub type FetchCompletion = Box<dyn FnOnce(FetchResult) + Send + 'static>;

/// Asynchronous byte fetcher
///
/// Contract:
/// - `fetch` returns immediately; the result arrives later through `completion`,
///   which is called at most once
/// - the returned handle cancels the fetch; a cancelled fetch never calls
///   `completion`
/// - cancelling after completion is a no-op
/// - timeouts are the fetcher's responsibility
pub trait Fetcher: Send + Sync {
    /// Start fetching `url`
    fn fetch(&self, url: &str, completion: FetchCompletion) -> Cancellable;
}

/// [`Fetcher`] backed by reqwest, one tokio task per fetch
///
/// The completion runs on tokio's blocking pool, so whatever it does with the
/// bytes (the image service decodes them) does not stall other fetches.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    runtime: tokio::runtime::Handle,
}

impl HttpFetcher {
    /// Create a fetcher bound to the current tokio runtime
    ///
    /// # Errors
    /// Returns error if called outside a tokio runtime or the HTTP client
    /// cannot be built
    pub fn new(config: &ImageConfig, user_agent: &str) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Other(format!("HttpFetcher requires a tokio runtime: {}", e)))?;

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
            runtime,
        })
    }

    async fn get(client: reqwest::Client, url: String, timeout: Duration) -> FetchResult {
        let response = client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.into() }
    } else {
        FetchError::Request {
            url: url.into(),
            reason: e.to_string(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, completion: FetchCompletion) -> Cancellable {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let request = Self::get(self.client.clone(), url.to_string(), self.timeout);
        let url = url.to_string();

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    debug!(url = %url, "image fetch cancelled");
                }
                result = request => {
                    // The completion decodes the image; keep that off the async workers.
                    if let Err(e) = tokio::task::spawn_blocking(move || completion(result)).await {
                        warn!(url = %url, error = %e, "image completion panicked");
                    }
                }
            }
        });

        Cancellable::new(move || token.cancel())
    }
}
