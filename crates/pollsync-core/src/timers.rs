use crate::pending::ActionHandle;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Delayed tasks keyed by the action they expire.
///
/// Each speculative action gets its own entry, so scheduling a newer action
/// never aborts an older timer; the older one simply finds its handle
/// superseded when it fires. `cancel_all` aborts everything on teardown and
/// refuses further scheduling.
pub struct TimerRegistry {
    pending: Arc<DashMap<ActionHandle, JoinHandle<()>>>,
    closed: AtomicBool,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Run `task` after `delay`. Returns false if the registry was shut down.
    pub fn schedule<F>(&self, key: ActionHandle, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.cancel(key);
        let pending = self.pending.clone();
        // The task must not deregister itself before it has been registered.
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if registered_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
            task.await;
            pending.remove(&key);
        });
        self.pending.insert(key, handle);
        let _ = registered_tx.send(());
        true
    }

    pub fn cancel(&self, key: ActionHandle) {
        if let Some((_, handle)) = self.pending.remove(&key) {
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        self.closed.store(true, Ordering::Release);
        let keys: Vec<ActionHandle> = self.pending.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            self.cancel(key);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of timers that have not fired yet.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
