//! Bounded in-memory store of decoded images

use image::DynamicImage;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache of decoded images keyed by resource key
///
/// When full, inserting a new key evicts the least recently read or written
/// entry. A capacity of zero is treated as one.
pub(crate) struct MemoryCache {
    entries: LruCache<String, Arc<DynamicImage>>,
}

impl MemoryCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<Arc<DynamicImage>> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn insert(&mut self, key: &str, image: Arc<DynamicImage>) {
        if let Some((evicted, _)) = self.entries.push(key.to_string(), image) {
            if evicted != key {
                tracing::debug!(key = %evicted, "evicting image from memory cache");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
