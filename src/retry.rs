//! Retrying listing requests
//!
//! Reddit answers busy periods with 429 or a 5xx, and a flaky connection
//! shows up as a timeout or a refused connect. [`with_retry`] runs a request
//! again after such failures, waiting on an exponential schedule capped at
//! [`RetryConfig::max_delay`]. When the server names a wait in `Retry-After`,
//! that wait (also capped) is used instead of the schedule.
//!
//! Thumbnail fetches do not go through here; a failed thumbnail is simply
//! requested again by the row that shows it.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Classifies failures as worth another attempt
pub trait IsRetryable {
    /// Whether the failure is transient
    fn is_retryable(&self) -> bool;

    /// Wait requested by the server before the next attempt, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            Error::Config { .. }
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Image(_)
            | Error::Other(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Wait schedule for one retried request
struct Backoff<'a> {
    config: &'a RetryConfig,
    next: Duration,
}

impl<'a> Backoff<'a> {
    fn new(config: &'a RetryConfig) -> Self {
        Self {
            config,
            next: config.initial_delay.min(config.max_delay),
        }
    }

    /// Wait before the next attempt; `hint` is the server's `Retry-After`
    fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        let scheduled = self.next;
        self.next = grow(scheduled, self.config.backoff_multiplier).min(self.config.max_delay);

        match hint {
            Some(hint) => hint.min(self.config.max_delay),
            None if self.config.jitter => add_jitter(scheduled),
            None => scheduled,
        }
    }
}

/// `delay * multiplier`, saturating instead of overflowing
fn grow(delay: Duration, multiplier: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier).unwrap_or(Duration::MAX)
}

/// Somewhere between half of `delay` and all of it
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    delay.mul_f64(factor)
}

/// Run `request` until it succeeds, fails permanently, or has been retried
/// `config.max_attempts` times
///
/// Returns the first success or the last error.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut request: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut backoff = Backoff::new(config);
    let mut retries = 0;

    loop {
        let error = match request().await {
            Ok(value) => {
                if retries > 0 {
                    debug!(retries, "request succeeded after retrying");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            debug!(error = %error, "request failed permanently");
            return Err(error);
        }
        if retries >= config.max_attempts {
            warn!(error = %error, retries, "giving up on request");
            return Err(error);
        }

        retries += 1;
        let delay = backoff.next_delay(error.retry_after());
        warn!(
            error = %error,
            retry = retries,
            of = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "request failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseError, ImageError};
    use crate::types::Page;
    use std::sync::Mutex;
    use std::time::Instant;

    fn config(max_attempts: u32, initial_ms: u64, max_ms: u64) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(max_ms),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn http(status: u16) -> Error {
        Error::Http {
            status,
            url: "https://www.reddit.com/top.json".into(),
            retry_after: None,
        }
    }

    /// Plays back `responses` in order, one per attempt
    async fn replay(
        config: &RetryConfig,
        responses: Vec<Result<Page, Error>>,
    ) -> (Result<Page, Error>, usize) {
        let responses = Mutex::new(responses.into_iter());
        let attempts = Mutex::new(0);
        let result = with_retry(config, || {
            *attempts.lock().unwrap() += 1;
            let next = responses.lock().unwrap().next().expect("ran out of responses");
            async move { next }
        })
        .await;
        let attempts = *attempts.lock().unwrap();
        (result, attempts)
    }

    #[tokio::test]
    async fn test_page_on_first_attempt() {
        let (result, attempts) = replay(&config(3, 5, 20), vec![Ok(Page::default())]).await;
        assert!(result.is_ok());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_busy_server_retried_until_page_arrives() {
        let responses = vec![Err(http(503)), Err(http(429)), Ok(Page::default())];
        let (result, attempts) = replay(&config(3, 5, 20), responses).await;
        assert!(result.is_ok());
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_gives_up_with_last_error() {
        let responses = vec![Err(http(500)), Err(http(502)), Err(http(503))];
        let (result, attempts) = replay(&config(2, 5, 20), responses).await;
        assert!(matches!(result, Err(Error::Http { status: 503, .. })));
        assert_eq!(attempts, 3, "first try plus two retries");
    }

    #[tokio::test]
    async fn test_missing_listing_not_retried() {
        let (result, attempts) = replay(&config(3, 5, 20), vec![Err(http(404))]).await;
        assert!(matches!(result, Err(Error::Http { status: 404, .. })));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_after_replaces_schedule() {
        let throttled = Error::Http {
            status: 429,
            url: "https://www.reddit.com/top.json".into(),
            retry_after: Some(Duration::from_millis(20)),
        };
        // The schedule alone would wait ten seconds.
        let start = Instant::now();
        let responses = vec![Err(throttled), Ok(Page::default())];
        let (result, _) = replay(&config(1, 10_000, 10_000), responses).await;

        assert!(result.is_ok());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn test_retry_after_capped_by_max_delay() {
        let throttled = Error::Http {
            status: 429,
            url: "https://www.reddit.com/top.json".into(),
            retry_after: Some(Duration::from_secs(3600)),
        };
        let start = Instant::now();
        let responses = vec![Err(throttled), Ok(Page::default())];
        let (result, _) = replay(&config(1, 5, 30), responses).await;

        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_huge_multiplier_saturates_at_max_delay() {
        let mut config = config(3, 5, 20);
        config.backoff_multiplier = 1e300;
        let responses = vec![
            Err(http(503)),
            Err(http(503)),
            Err(http(503)),
            Ok(Page::default()),
        ];

        let start = Instant::now();
        let (result, attempts) = replay(&config, responses).await;

        assert!(result.is_ok());
        assert_eq!(attempts, 4);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_schedule_doubles_up_to_cap() {
        let config = config(5, 10, 30);
        let mut backoff = Backoff::new(&config);
        let delays: Vec<u128> = (0..4).map(|_| backoff.next_delay(None).as_millis()).collect();
        assert_eq!(delays, vec![10, 20, 30, 30]);
    }

    #[test]
    fn test_schedule_survives_non_finite_multiplier() {
        let mut config = config(5, 10, 30);
        config.backoff_multiplier = f64::INFINITY;
        let mut backoff = Backoff::new(&config);
        assert_eq!(backoff.next_delay(None), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(None), Duration::from_millis(30));

        config.backoff_multiplier = f64::NAN;
        let mut backoff = Backoff::new(&config);
        backoff.next_delay(None);
        assert_eq!(backoff.next_delay(None), Duration::from_millis(30));
    }

    #[test]
    fn test_initial_delay_above_cap_is_capped() {
        let config = config(5, 500, 50);
        let mut backoff = Backoff::new(&config);
        assert_eq!(backoff.next_delay(None), Duration::from_millis(50));
    }

    #[test]
    fn test_jitter_never_exceeds_scheduled_delay() {
        let delay = Duration::from_millis(100);
        for _ in 0..20 {
            let jittered = add_jitter(delay);
            assert!(jittered >= delay / 2);
            assert!(jittered <= delay);
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(http(429).is_retryable());
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!http(403).is_retryable());
    }

    #[test]
    fn test_io_classification() {
        let io = |kind| Error::Io(std::io::Error::new(kind, "io"));
        assert!(io(std::io::ErrorKind::TimedOut).is_retryable());
        assert!(io(std::io::ErrorKind::ConnectionReset).is_retryable());
        assert!(!io(std::io::ErrorKind::NotFound).is_retryable());
    }

    #[test]
    fn test_local_failures_are_permanent() {
        assert!(!Error::config("bad", "reddit.base_url").is_retryable());
        assert!(
            !Error::Database(DatabaseError::QueryFailed("db error".to_string())).is_retryable()
        );
        assert!(!Error::Image(ImageError::InvalidKey).is_retryable());
        assert!(
            !Error::Serialization(serde_json::from_str::<String>("bad json").unwrap_err())
                .is_retryable()
        );
        assert!(!Error::Other("unknown problem".to_string()).is_retryable());
    }

    #[test]
    fn test_only_http_errors_carry_retry_after() {
        let throttled = Error::Http {
            status: 429,
            url: "https://www.reddit.com/new.json".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(throttled.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(http(503).retry_after(), None);
        assert_eq!(Error::Other("x".into()).retry_after(), None);
    }
}
