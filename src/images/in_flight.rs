//! Bookkeeping for one pending image fetch shared by several subscribers

use super::{Cancellable, ImageCallback, ImageResult};

/// Identifier of one subscriber; unique for the lifetime of an [`ImageService`](super::ImageService)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of removing a subscriber from an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Detach {
    /// The subscriber was not registered (already notified or already detached)
    Unknown,
    /// Removed; other subscribers are still waiting
    Remaining(usize),
    /// Removed the last subscriber; the upstream fetch should be cancelled
    Emptied,
}

/// In-flight entry for one resource key
///
/// Subscribers are kept in insertion order so notification order is
/// deterministic.
pub(crate) struct InFlight {
    generation: u64,
    subscribers: Vec<(SubscriberId, ImageCallback)>,
    upstream: Option<Cancellable>,
}

impl InFlight {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            subscribers: Vec::new(),
            upstream: None,
        }
    }

    /// Identifies this entry among successive entries for the same key
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn add_subscriber(&mut self, id: SubscriberId, callback: ImageCallback) {
        self.subscribers.push((id, callback));
    }

    pub(crate) fn remove_subscriber(&mut self, id: SubscriberId) -> Detach {
        let Some(position) = self.subscribers.iter().position(|(sid, _)| *sid == id) else {
            return Detach::Unknown;
        };
        self.subscribers.remove(position);
        if self.subscribers.is_empty() {
            Detach::Emptied
        } else {
            Detach::Remaining(self.subscribers.len())
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn set_upstream(&mut self, upstream: Cancellable) {
        self.upstream = Some(upstream);
    }

    pub(crate) fn take_upstream(&mut self) -> Option<Cancellable> {
        self.upstream.take()
    }

    /// Invoke every registered callback once with `result`, then forget them
    ///
    /// Calling it again is a no-op.
    pub(crate) fn notify_all(&mut self, result: ImageResult) {
        for (_, callback) in self.subscribers.drain(..) {
            callback(result.clone());
        }
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("generation", &self.generation)
            .field("subscribers", &self.subscribers.len())
            .field("has_upstream", &self.upstream.is_some())
            .finish()
    }
}
