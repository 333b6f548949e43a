//! Merges authoritative push-channel events into the view model.
//!
//! Events are processed one at a time in arrival order. For a counter update
//! on a poll with a live speculative action of the matching kind, the event is
//! compared against what the store already shows: a matching event is the
//! echo of our own action and is dropped, a differing one overwrites the
//! optimistic values and ends the trust window.

use crate::pending::{ActionHandle, ActionKind};
use crate::state::SyncState;
use pollsync_models::{OptionCount, Poll, PollLikeUpdate, PollSummary, PollVoteUpdate, RemoteEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// New poll placed at the head of the list.
    Inserted,
    /// No pending action; fields applied verbatim.
    Applied,
    /// Pending action contradicted; authoritative values applied and the action confirmed.
    Overridden,
    /// Pending action matched; event discarded.
    Suppressed,
    /// The poll is not held by this session.
    Ignored,
}

pub fn reconcile(state: &mut SyncState, event: RemoteEvent) -> Outcome {
    state.metrics.event_received(&event);
    let outcome = match event {
        RemoteEvent::PollCreated { poll } => {
            tracing::debug!(poll_id = poll.id, "poll created");
            state.store.insert_head(poll.summary());
            Outcome::Inserted
        }
        RemoteEvent::PollVoteUpdated(update) => reconcile_votes(state, &update),
        RemoteEvent::PollLikeUpdated(update) => reconcile_likes(state, &update),
    };

    match outcome {
        Outcome::Applied => state.metrics.verbatim_applied(),
        Outcome::Overridden => state.metrics.override_applied(),
        Outcome::Suppressed => state.metrics.echo_suppressed(),
        Outcome::Inserted | Outcome::Ignored => {}
    }
    outcome
}

fn reconcile_votes(state: &mut SyncState, update: &PollVoteUpdate) -> Outcome {
    let poll_id = update.poll_id;
    if !state.store.contains(poll_id) {
        return Outcome::Ignored;
    }
    let counts = update.counts();

    let Some(handle) = state.tracker.active_handle(poll_id, ActionKind::Vote) else {
        apply_votes(state, poll_id, update.total_votes, &counts);
        return Outcome::Applied;
    };

    if !votes_significant(state, poll_id, update.total_votes, &counts) {
        tracing::debug!(poll_id, seq = handle.seq, "vote echo suppressed");
        return Outcome::Suppressed;
    }

    apply_votes(state, poll_id, update.total_votes, &counts);
    state.tracker.confirm_overridden(handle);
    tracing::debug!(
        poll_id,
        seq = handle.seq,
        total_votes = update.total_votes,
        "optimistic vote overridden by authoritative update"
    );
    Outcome::Overridden
}

fn reconcile_likes(state: &mut SyncState, update: &PollLikeUpdate) -> Outcome {
    let poll_id = update.poll_id;
    if !state.store.contains(poll_id) {
        return Outcome::Ignored;
    }

    // A like event answers either a pending like or a pending unlike.
    let handles: Vec<ActionHandle> = [ActionKind::Like, ActionKind::Unlike]
        .into_iter()
        .filter_map(|kind| state.tracker.active_handle(poll_id, kind))
        .collect();

    if handles.is_empty() {
        state.store.set_total_likes(poll_id, update.total_likes);
        return Outcome::Applied;
    }

    if state.store.total_likes(poll_id) == Some(update.total_likes) {
        tracing::debug!(poll_id, "like echo suppressed");
        return Outcome::Suppressed;
    }

    state.store.set_total_likes(poll_id, update.total_likes);
    for handle in handles {
        state.tracker.confirm_overridden(handle);
    }
    tracing::debug!(
        poll_id,
        total_likes = update.total_likes,
        "optimistic like overridden by authoritative update"
    );
    Outcome::Overridden
}

/// Structural comparison of the event's counters against the store.
///
/// Options are matched by id, so the order they arrive in is irrelevant. An
/// option the store does not know counts as a difference.
fn votes_significant(
    state: &SyncState,
    poll_id: i64,
    total_votes: u32,
    counts: &[OptionCount],
) -> bool {
    if state.store.total_votes(poll_id) != Some(total_votes) {
        return true;
    }
    if state.store.focused_poll(poll_id).is_none() {
        return false;
    }
    counts
        .iter()
        .any(|c| state.store.option_count(poll_id, c.id) != Some(c.vote_count))
}

/// All-or-nothing write of the vote counters.
fn apply_votes(state: &mut SyncState, poll_id: i64, total_votes: u32, counts: &[OptionCount]) {
    state.store.set_total_votes(poll_id, total_votes);
    if state.store.focused_poll(poll_id).is_none() {
        return;
    }
    for count in counts {
        if !state.store.set_option_count(poll_id, count.id, count.vote_count) {
            tracing::debug!(poll_id, option_id = count.id, "update names an unknown option");
        }
    }
}

fn likes_pending(state: &SyncState, poll_id: i64) -> bool {
    state.tracker.is_pending(poll_id, ActionKind::Like)
        || state.tracker.is_pending(poll_id, ActionKind::Unlike)
}

/// Replace the list with a fetched listing.
///
/// Request responses are not authoritative for counters, so polls with a
/// live speculative action keep the counters the store currently shows.
pub fn merge_listing(state: &mut SyncState, mut polls: Vec<PollSummary>) {
    for summary in &mut polls {
        let Some(current) = state.store.summary(summary.id) else {
            continue;
        };
        if state.tracker.is_pending(summary.id, ActionKind::Vote) {
            summary.total_votes = current.total_votes;
        }
        if likes_pending(state, summary.id) {
            summary.total_likes = current.total_likes;
        }
    }
    state.store.replace_polls(polls);
}

/// Install a fetched poll as the focused one, keeping speculative counters
/// for a poll that is already focused and has live actions.
pub fn merge_fetched_poll(state: &mut SyncState, mut poll: Poll) {
    if let Some(current) = state.store.focused_poll(poll.id) {
        if state.tracker.is_pending(poll.id, ActionKind::Vote) {
            poll.total_votes = current.total_votes;
            for option in &mut poll.options {
                if let Some(kept) = current.option(option.id) {
                    option.vote_count = kept.vote_count;
                }
            }
        }
        if likes_pending(state, poll.id) {
            poll.total_likes = current.total_likes;
        }
    }
    state.store.set_focused(Some(poll));
}
