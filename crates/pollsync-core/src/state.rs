use crate::observability::SyncMetrics;
use crate::pending::PendingActionTracker;
use crate::store::ViewModelStore;
use crate::EngineConfig;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Everything the applier and reconciler mutate, guarded together so one
/// poll's counters and its pending flags always change atomically.
#[derive(Debug)]
pub struct SyncState {
    pub store: ViewModelStore,
    pub tracker: PendingActionTracker,
    pub metrics: Arc<SyncMetrics>,
}

impl SyncState {
    pub fn new(config: &EngineConfig, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            store: ViewModelStore::new(),
            tracker: PendingActionTracker::new(config.vote_trust_window, config.like_trust_window),
            metrics,
        }
    }
}

/// Cloneable handle to the session's single mutex plus a change counter.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<SyncState>>,
    version: Arc<watch::Sender<u64>>,
}

impl SharedState {
    pub fn new(state: SyncState) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(state)),
            version: Arc::new(version),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Read without signalling a change.
    pub fn read<R>(&self, f: impl FnOnce(&SyncState) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    /// Mutate and bump the change counter. The guard is never held across an await.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut SyncState) -> R) -> R {
        let result = {
            let mut guard = self.lock();
            f(&mut guard)
        };
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        result
    }

    /// Like `mutate`, but only signals a change when `f` succeeds.
    pub fn try_mutate<R, E>(&self, f: impl FnOnce(&mut SyncState) -> Result<R, E>) -> Result<R, E> {
        let result = {
            let mut guard = self.lock();
            f(&mut guard)
        };
        if result.is_ok() {
            self.version.send_modify(|v| *v = v.wrapping_add(1));
        }
        result
    }

    pub fn snapshot(&self) -> ViewModelStore {
        self.read(|state| state.store.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
