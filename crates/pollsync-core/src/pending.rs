use crate::error::CoreError;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Vote,
    Like,
    Unlike,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Vote => "vote",
            ActionKind::Like => "like",
            ActionKind::Unlike => "unlike",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A speculative mutation that is in flight or inside its trust window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub poll_id: i64,
    pub kind: ActionKind,
    pub target_option_id: Option<i64>,
    pub seq: u64,
    pub applied_at: Instant,
    pub expires_at: Instant,
}

impl PendingAction {
    pub fn handle(&self) -> ActionHandle {
        ActionHandle {
            poll_id: self.poll_id,
            kind: self.kind,
            seq: self.seq,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Identifies one registration. `seq` increases monotonically per poll+kind,
/// so a handle from a superseded action never matches the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionHandle {
    pub poll_id: i64,
    pub kind: ActionKind,
    pub seq: u64,
}

type SlotKey = (i64, ActionKind);

/// Trust-window bookkeeping. Never holds poll content.
#[derive(Debug)]
pub struct PendingActionTracker {
    vote_window: Duration,
    like_window: Duration,
    active: HashMap<SlotKey, PendingAction>,
    sequences: HashMap<SlotKey, u64>,
    /// Latest sequence per slot whose counters an authoritative update replaced.
    overridden: HashMap<SlotKey, u64>,
}

impl PendingActionTracker {
    pub fn new(vote_window: Duration, like_window: Duration) -> Self {
        Self {
            vote_window,
            like_window,
            active: HashMap::new(),
            sequences: HashMap::new(),
            overridden: HashMap::new(),
        }
    }

    pub fn window(&self, kind: ActionKind) -> Duration {
        match kind {
            ActionKind::Vote => self.vote_window,
            ActionKind::Like | ActionKind::Unlike => self.like_window,
        }
    }

    /// Register a new speculative action.
    ///
    /// A live action with the same poll and kind blocks the new one; an entry
    /// whose window already lapsed (timer not yet run) is replaced.
    pub fn begin(
        &mut self,
        poll_id: i64,
        kind: ActionKind,
        target_option_id: Option<i64>,
    ) -> Result<ActionHandle, CoreError> {
        let now = Instant::now();
        let key = (poll_id, kind);
        if self.active.get(&key).is_some_and(|a| a.is_live(now)) {
            return Err(CoreError::AlreadyPending { poll_id, kind });
        }

        let seq = self.sequences.entry(key).or_insert(0);
        *seq += 1;
        let action = PendingAction {
            poll_id,
            kind,
            target_option_id,
            seq: *seq,
            applied_at: now,
            expires_at: now + self.window(kind),
        };
        let handle = action.handle();
        self.active.insert(key, action);
        Ok(handle)
    }

    pub fn is_pending(&self, poll_id: i64, kind: ActionKind) -> bool {
        self.active_handle(poll_id, kind).is_some()
    }

    /// Handle of the live action for this poll+kind, if any.
    pub fn active_handle(&self, poll_id: i64, kind: ActionKind) -> Option<ActionHandle> {
        let now = Instant::now();
        self.active
            .get(&(poll_id, kind))
            .filter(|a| a.is_live(now))
            .map(PendingAction::handle)
    }

    pub fn get(&self, poll_id: i64, kind: ActionKind) -> Option<&PendingAction> {
        self.active.get(&(poll_id, kind))
    }

    /// End the trust window early. Returns whether anything was removed.
    pub fn confirm(&mut self, handle: ActionHandle) -> bool {
        self.remove_if_current(handle)
    }

    /// Confirm an action whose counters were replaced by an authoritative
    /// update, remembering it so a later rollback leaves those counters alone.
    pub fn confirm_overridden(&mut self, handle: ActionHandle) -> bool {
        let removed = self.remove_if_current(handle);
        if removed {
            self.overridden
                .insert((handle.poll_id, handle.kind), handle.seq);
        }
        removed
    }

    /// Whether `handle` was confirmed by an override. Forgets it either way.
    pub fn take_overridden(&mut self, handle: ActionHandle) -> bool {
        let key = (handle.poll_id, handle.kind);
        if self.overridden.get(&key) == Some(&handle.seq) {
            self.overridden.remove(&key);
            return true;
        }
        false
    }

    /// Timer path. A handle superseded by a newer action is a no-op.
    pub fn expire(&mut self, handle: ActionHandle) -> bool {
        self.remove_if_current(handle)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.overridden.clear();
    }

    fn remove_if_current(&mut self, handle: ActionHandle) -> bool {
        let key = (handle.poll_id, handle.kind);
        match self.active.get(&key) {
            Some(action) if action.seq == handle.seq => {
                self.active.remove(&key);
                true
            }
            _ => false,
        }
    }
}
