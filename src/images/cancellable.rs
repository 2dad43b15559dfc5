//! One-shot revocation handle

use std::sync::{Mutex, PoisonError};

type Action = Box<dyn FnOnce() + Send + 'static>;

/// A one-shot, idempotent revocation capability
///
/// Wraps a single no-argument action. The first call to [`cancel`](Self::cancel)
/// runs it; later calls do nothing. Dropping a `Cancellable` does **not** run
/// the action.
pub struct Cancellable {
    action: Mutex<Option<Action>>,
}

impl Cancellable {
    /// Wrap `action` so it runs at most once
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// A handle with nothing to revoke
    pub fn noop() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    /// Run the wrapped action if it has not run yet
    pub fn cancel(&self) {
        // Guard is released before the action runs; the action may re-enter.
        let action = self
            .action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(action) = action {
            action();
        }
    }

    /// Whether the action has already run (or there never was one)
    pub fn is_spent(&self) -> bool {
        self.action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl std::fmt::Debug for Cancellable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellable")
            .field("spent", &self.is_spent())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_cancel_runs_action_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let handle = Cancellable::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!handle.is_spent());
        handle.cancel();
        handle.cancel();
        handle.cancel();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_spent());
    }

    #[test]
    fn test_drop_does_not_cancel() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        drop(Cancellable::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_noop_handle() {
        let handle = Cancellable::noop();
        assert!(handle.is_spent());
        handle.cancel();
    }

    #[test]
    fn test_action_may_cancel_reentrantly() {
        let handle = Arc::new(Cancellable::noop());
        let inner = handle.clone();
        let outer = Cancellable::new(move || inner.cancel());
        outer.cancel();
        assert!(outer.is_spent());
    }
}
