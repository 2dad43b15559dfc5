//! Small helpers shared by the view layer
//!
//! [`Debouncer`] collapses a burst of calls (scroll events, search keystrokes)
//! into a single invocation once the burst has been quiet for a while.

use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Runs a callback once after `delay` has passed without another [`call`](Debouncer::call)
pub struct Debouncer {
    delay: Duration,
    callback: Callback,
    pending: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl Debouncer {
    /// Create a debouncer on the current tokio runtime
    ///
    /// # Errors
    /// Returns error if called outside a tokio runtime
    pub fn new<F>(delay: Duration, callback: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Other(format!("debouncer needs a tokio runtime: {}", e)))?;

        Ok(Self {
            delay,
            callback: Arc::new(callback),
            pending: Mutex::new(None),
            runtime,
        })
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule the callback, pushing back any firing that is already pending
    pub fn call(&self) {
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });

        if let Some(previous) = self.pending().replace(task) {
            trace!("rescheduling debounced call");
            previous.abort();
        }
    }

    /// Drop any pending firing and run the callback right away
    pub fn fire_now(&self) {
        self.cancel();
        (self.callback)();
    }

    /// Drop any pending firing
    pub fn cancel(&self) {
        if let Some(previous) = self.pending().take() {
            previous.abort();
        }
    }

    /// Whether a firing is scheduled and has not run yet
    pub fn is_pending(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}
