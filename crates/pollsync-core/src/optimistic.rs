//! Speculative writes applied before the network round trip.

use crate::error::CoreError;
use crate::pending::{ActionHandle, ActionKind};
use crate::state::SyncState;

/// Counter change made by one speculative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Vote { option_id: i64 },
    Like,
    Unlike,
}

/// Result of the synchronous half of an action; feed it to the network half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMutation {
    pub handle: ActionHandle,
    pub delta: Delta,
    /// Text of the voted option, for user feedback.
    pub option_text: Option<String>,
}

impl AppliedMutation {
    pub fn poll_id(&self) -> i64 {
        self.handle.poll_id
    }

    pub fn kind(&self) -> ActionKind {
        self.handle.kind
    }
}

fn step(value: u32, up: bool) -> u32 {
    if up {
        value.saturating_add(1)
    } else {
        value.saturating_sub(1)
    }
}

/// Apply `delta` (or its inverse) to every copy of the poll the store holds.
fn write_delta(state: &mut SyncState, poll_id: i64, delta: Delta, forward: bool) {
    let store = &mut state.store;
    match delta {
        Delta::Vote { option_id } => {
            if let Some(total) = store.total_votes(poll_id) {
                store.set_total_votes(poll_id, step(total, forward));
            }
            if let Some(count) = store.option_count(poll_id, option_id) {
                store.set_option_count(poll_id, option_id, step(count, forward));
            }
        }
        Delta::Like | Delta::Unlike => {
            let up = matches!(delta, Delta::Like) == forward;
            if let Some(total) = store.total_likes(poll_id) {
                store.set_total_likes(poll_id, step(total, up));
            }
            store.set_liked(poll_id, up);
        }
    }
}

/// Validate, register and apply a vote. The store is untouched on error.
pub fn apply_vote(
    state: &mut SyncState,
    poll_id: i64,
    option_id: i64,
) -> Result<AppliedMutation, CoreError> {
    let poll = state
        .store
        .focused_poll(poll_id)
        .ok_or(CoreError::UnknownPoll(poll_id))?;
    let option_text = poll
        .option(option_id)
        .map(|o| o.option_text.clone())
        .ok_or(CoreError::InvalidOption { poll_id, option_id })?;

    let handle = state.tracker.begin(poll_id, ActionKind::Vote, Some(option_id))?;
    let delta = Delta::Vote { option_id };
    write_delta(state, poll_id, delta, true);
    tracing::debug!(poll_id, option_id, seq = handle.seq, "optimistic vote applied");

    Ok(AppliedMutation {
        handle,
        delta,
        option_text: Some(option_text),
    })
}

pub fn apply_like(state: &mut SyncState, poll_id: i64) -> Result<AppliedMutation, CoreError> {
    apply_like_kind(state, poll_id, ActionKind::Like, Delta::Like)
}

pub fn apply_unlike(state: &mut SyncState, poll_id: i64) -> Result<AppliedMutation, CoreError> {
    apply_like_kind(state, poll_id, ActionKind::Unlike, Delta::Unlike)
}

fn apply_like_kind(
    state: &mut SyncState,
    poll_id: i64,
    kind: ActionKind,
    delta: Delta,
) -> Result<AppliedMutation, CoreError> {
    if !state.store.contains(poll_id) {
        return Err(CoreError::UnknownPoll(poll_id));
    }
    let handle = state.tracker.begin(poll_id, kind, None)?;
    write_delta(state, poll_id, delta, true);
    tracing::debug!(poll_id, kind = %kind, seq = handle.seq, "optimistic like applied");

    Ok(AppliedMutation {
        handle,
        delta,
        option_text: None,
    })
}

/// Undo a failed mutation: inverse delta plus removal of its pending entry.
///
/// Also applies when the trust window already lapsed; the tracker removal is
/// then a no-op because the handle no longer matches. Counters an
/// authoritative update already replaced for this action are left as they
/// are; only the liked flag reverts.
pub fn rollback(state: &mut SyncState, applied: &AppliedMutation) {
    let poll_id = applied.poll_id();
    let overridden = state.tracker.take_overridden(applied.handle);
    if overridden {
        if let Delta::Like | Delta::Unlike = applied.delta {
            state.store.set_liked(poll_id, applied.delta == Delta::Unlike);
        }
    } else {
        write_delta(state, poll_id, applied.delta, false);
    }
    let removed = state.tracker.confirm(applied.handle);
    state.metrics.rolled_back();
    tracing::warn!(
        poll_id,
        kind = %applied.kind(),
        seq = applied.handle.seq,
        pending_removed = removed,
        overridden,
        "optimistic update rolled back"
    );
}
