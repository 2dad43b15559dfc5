//! Thumbnail loading
//!
//! [`ImageService`] is a single-flight, memoizing layer over a [`Fetcher`]:
//!
//! - a key found in the memory cache is answered synchronously
//! - a key already being fetched gets the new caller attached to that fetch
//! - anything else starts exactly one upstream fetch
//!
//! Every caller attached to a fetch gets one callback when it resolves, unless
//! it detached first through the [`Cancellable`] it was handed. The upstream
//! fetch is cancelled only when its last caller detaches.
//!
//! ## Submodules
//!
//! - [`cancellable`]: one-shot revocation handle
//! - [`fetcher`]: the fetch primitive and its reqwest implementation
//! - `in_flight`: per-key subscriber bookkeeping
//! - `memory_cache`: bounded LRU of decoded images
//! - [`service`]: the public entry point

use crate::error::ImageError;
use image::DynamicImage;
use std::sync::Arc;

pub mod cancellable;
pub mod fetcher;
mod in_flight;
mod memory_cache;
pub mod service;

pub use cancellable::Cancellable;
pub use fetcher::{FetchCompletion, FetchResult, Fetcher, HttpFetcher};
pub use in_flight::SubscriberId;
pub use service::ImageService;

/// What an image subscriber receives
pub type ImageResult = std::result::Result<Arc<DynamicImage>, ImageError>;

/// Boxed subscriber callback
pub type ImageCallback = Box<dyn FnOnce(ImageResult) + Send + 'static>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
