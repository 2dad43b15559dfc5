//! Single-flight image cache service

use super::fetcher::{FetchResult, Fetcher, HttpFetcher};
use super::in_flight::{Detach, InFlight, SubscriberId};
use super::memory_cache::MemoryCache;
use super::{Cancellable, ImageCallback, ImageResult};
use crate::config::Config;
use crate::error::{FetchError, ImageError, Result};
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

struct State {
    cache: MemoryCache,
    in_flight: HashMap<String, InFlight>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct Shared {
    state: Mutex<State>,
    fetcher: Arc<dyn Fetcher>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn detach(&self, key: &str, id: SubscriberId) {
        let upstream = {
            let mut state = self.lock();
            let Some(entry) = state.in_flight.get_mut(key) else {
                return;
            };
            match entry.remove_subscriber(id) {
                Detach::Unknown => return,
                Detach::Remaining(left) => {
                    debug!(key, subscriber = %id, remaining = left, "image subscriber detached");
                    return;
                }
                Detach::Emptied => state
                    .in_flight
                    .remove(key)
                    .and_then(|mut entry| entry.take_upstream()),
            }
        };

        debug!(key, subscriber = %id, "last image subscriber detached, cancelling fetch");
        // The upstream handle may still be missing if the fetch is being
        // started right now; `request` cancels it once it sees the entry gone.
        if let Some(upstream) = upstream {
            upstream.cancel();
        }
    }

    fn complete(&self, key: &str, generation: u64, result: FetchResult) {
        let outcome = match result {
            Ok(bytes) => decode(key, &bytes),
            Err(e) => Err(ImageError::Transport(e)),
        };

        let entry = {
            let mut state = self.lock();
            match state.in_flight.get(key) {
                Some(entry) if entry.generation() == generation => {}
                _ => {
                    debug!(key, "ignoring completion for an entry that no longer exists");
                    return;
                }
            }
            if let Ok(image) = &outcome {
                state.cache.insert(key, Arc::clone(image));
            }
            state.in_flight.remove(key)
        };

        if let Some(mut entry) = entry {
            match &outcome {
                Ok(_) => debug!(key, subscribers = entry.subscriber_count(), "image loaded"),
                Err(e) => warn!(key, error = %e, subscribers = entry.subscriber_count(), "image load failed"),
            }
            entry.notify_all(outcome);
        }
    }
}

fn decode(key: &str, bytes: &[u8]) -> ImageResult {
    image::load_from_memory(bytes)
        .map(Arc::new)
        .map_err(|e| ImageError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Single-flight, memoizing image loader
///
/// For every resource key at most one upstream fetch is active. Callers that
/// ask for a key already being fetched join the pending fetch; once it
/// resolves, every joined caller receives the same result exactly once and
/// successful images are kept in a bounded memory cache.
///
/// All bookkeeping sits behind one lock; callbacks always run with that lock
/// released, so a callback may call back into the service.
///
/// # Example
///
/// ```no_run
/// use reddit_top::{Config, ImageService};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let images = ImageService::from_config(&Config::default())?;
/// let handle = images.request("https://i.redd.it/abc.jpg", |result| match result {
///     Ok(image) => println!("{}x{}", image.width(), image.height()),
///     Err(e) => eprintln!("{e}"),
/// });
/// // Cell scrolled away before the image arrived
/// if let Some(handle) = handle {
///     handle.cancel();
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ImageService {
    shared: Arc<Shared>,
}

impl ImageService {
    /// Create a service over `fetcher` keeping at most `cache_capacity` images
    pub fn new(fetcher: Arc<dyn Fetcher>, cache_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    cache: MemoryCache::new(cache_capacity),
                    in_flight: HashMap::new(),
                    next_id: 0,
                }),
                fetcher,
            }),
        }
    }

    /// Create a service backed by [`HttpFetcher`]
    ///
    /// # Errors
    /// Returns error if called outside a tokio runtime or the HTTP client
    /// cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.images, &config.reddit.user_agent)?;
        Ok(Self::new(Arc::new(fetcher), config.images.cache_capacity))
    }

    /// Request the image for `key`
    ///
    /// - cached: `on_complete` runs synchronously with the image and `None` is
    ///   returned, there is nothing to cancel
    /// - already being fetched: `on_complete` joins that fetch
    /// - otherwise: a new fetch starts
    ///
    /// In the last two cases the returned handle detaches `on_complete`; when
    /// the last subscriber of a key detaches, the upstream fetch is cancelled.
    /// An empty key fails synchronously with [`ImageError::InvalidKey`].
    pub fn request<F>(&self, key: &str, on_complete: F) -> Option<Cancellable>
    where
        F: FnOnce(ImageResult) + Send + 'static,
    {
        if key.is_empty() {
            on_complete(Err(ImageError::InvalidKey));
            return None;
        }

        let callback: ImageCallback = Box::new(on_complete);
        let mut state = self.shared.lock();

        if let Some(image) = state.cache.get(key) {
            drop(state);
            debug!(key, "image served from memory cache");
            callback(Ok(image));
            return None;
        }

        let id = SubscriberId(state.next_id());

        if let Some(entry) = state.in_flight.get_mut(key) {
            entry.add_subscriber(id, callback);
            debug!(key, subscriber = %id, subscribers = entry.subscriber_count(), "joined in-flight image fetch");
            return Some(self.detach_handle(key, id));
        }

        let generation = state.next_id();
        let mut entry = InFlight::new(generation);
        entry.add_subscriber(id, callback);
        state.in_flight.insert(key.to_string(), entry);
        drop(state);

        debug!(key, subscriber = %id, "starting image fetch");
        let completion = {
            let shared = Arc::downgrade(&self.shared);
            let key = key.to_string();
            Box::new(move |result: FetchResult| {
                if let Some(shared) = shared.upgrade() {
                    shared.complete(&key, generation, result);
                }
            })
        };
        let upstream = self.shared.fetcher.fetch(key, completion);

        let orphaned = {
            let mut state = self.shared.lock();
            match state.in_flight.get_mut(key) {
                Some(entry) if entry.generation() == generation => {
                    entry.set_upstream(upstream);
                    None
                }
                // Resolved synchronously, or every subscriber already left.
                _ => Some(upstream),
            }
        };
        if let Some(upstream) = orphaned {
            upstream.cancel();
        }

        Some(self.detach_handle(key, id))
    }

    /// Await the image for `key`
    ///
    /// Built on [`request`](Self::request). Dropping the future before it
    /// resolves detaches its subscriber.
    pub async fn load(&self, key: &str) -> std::result::Result<Arc<DynamicImage>, ImageError> {
        let (tx, rx) = futures::channel::oneshot::channel();
        let handle = self.request(key, move |result| {
            let _ = tx.send(result);
        });

        let guard = DetachOnDrop(handle);
        let result = rx.await;
        guard.disarm();

        result.unwrap_or_else(|_| {
            Err(ImageError::Transport(FetchError::Abandoned {
                url: key.to_string(),
            }))
        })
    }

    /// Cached image for `key`, without fetching
    pub fn cached(&self, key: &str) -> Option<Arc<DynamicImage>> {
        self.shared.lock().cache.get(key)
    }

    /// Whether a fetch for `key` is pending
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.shared.lock().in_flight.contains_key(key)
    }

    /// Number of keys with a pending fetch
    pub fn in_flight_count(&self) -> usize {
        self.shared.lock().in_flight.len()
    }

    /// Number of subscribers waiting on `key`
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.shared
            .lock()
            .in_flight
            .get(key)
            .map_or(0, InFlight::subscriber_count)
    }

    /// Number of images in the memory cache
    pub fn cached_count(&self) -> usize {
        self.shared.lock().cache.len()
    }

    /// Drop every cached image; pending fetches are unaffected
    pub fn clear_cache(&self) {
        self.shared.lock().cache.clear();
    }

    fn detach_handle(&self, key: &str, id: SubscriberId) -> Cancellable {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let key = key.to_string();
        Cancellable::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.detach(&key, id);
            }
        })
    }
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ImageService")
            .field("cached", &state.cache.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

struct DetachOnDrop(Option<Cancellable>);

impl DetachOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.cancel();
        }
    }
}
