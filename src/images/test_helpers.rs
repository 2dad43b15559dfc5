//! Test-controlled fetcher for exercising the image service deterministically

use super::{Cancellable, FetchCompletion, FetchResult, Fetcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct PendingFetch {
    url: String,
    completion: Option<FetchCompletion>,
    cancelled: Arc<AtomicBool>,
}

/// Records every fetch and lets the test decide when and how each resolves
#[derive(Default)]
pub(crate) struct ManualFetcher {
    fetches: Mutex<Vec<PendingFetch>>,
}

impl ManualFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total number of fetches issued
    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    /// Number of fetches issued for `url`
    pub(crate) fn fetch_count_for(&self, url: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.url == url)
            .count()
    }

    /// Whether the most recent fetch for `url` was cancelled
    pub(crate) fn is_cancelled(&self, url: &str) -> bool {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|f| f.url == url)
            .map(|f| f.cancelled.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Resolve the most recent unresolved fetch for `url`
    ///
    /// Delivers the result even if the fetch was cancelled, to simulate a
    /// completion racing with cancellation.
    pub(crate) fn complete(&self, url: &str, result: FetchResult) {
        let completion = self
            .fetches
            .lock()
            .unwrap()
            .iter_mut()
            .rev()
            .find(|f| f.url == url && f.completion.is_some())
            .and_then(|f| f.completion.take())
            .unwrap_or_else(|| panic!("no pending fetch for {url}"));
        completion(result);
    }
}

impl Fetcher for ManualFetcher {
    fn fetch(&self, url: &str, completion: FetchCompletion) -> Cancellable {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.fetches.lock().unwrap().push(PendingFetch {
            url: url.to_string(),
            completion: Some(completion),
            cancelled: cancelled.clone(),
        });
        Cancellable::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}

/// Fetcher that resolves inside `fetch`, before returning its handle
pub(crate) struct ImmediateFetcher {
    pub(crate) bytes: Vec<u8>,
}

impl Fetcher for ImmediateFetcher {
    fn fetch(&self, _url: &str, completion: FetchCompletion) -> Cancellable {
        completion(Ok(self.bytes.clone()));
        Cancellable::noop()
    }
}

/// A small valid PNG
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::new_rgb8(width, height);
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
