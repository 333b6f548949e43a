//! Session controller: the entry point hosts drive after authentication.
//!
//! Each user action is split in two. The synchronous half validates the
//! request, writes the speculative delta and registers the pending action,
//! so a render right after the call already shows the new counters. The
//! asynchronous half sends the request and rolls the delta back if it fails.

use crate::api::{PollApi, PushTransport};
use crate::error::CoreError;
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::observability::{SyncMetrics, SyncMetricsSnapshot};
use crate::optimistic::{self, AppliedMutation, Delta};
use crate::pending::ActionKind;
use crate::reconcile::{self, Outcome};
use crate::state::{SharedState, SyncState};
use crate::store::ViewModelStore;
use crate::supervisor::{ConnectionState, ConnectionSupervisor};
use crate::EngineConfig;
use pollsync_models::{NewPoll, Poll, RemoteEvent};
use std::sync::Arc;
use tokio::sync::watch;

pub struct PollSession<A: PollApi> {
    api: A,
    state: SharedState,
    supervisor: ConnectionSupervisor,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<SyncMetrics>,
}

impl<A: PollApi> PollSession<A> {
    pub fn new(api: A, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        let metrics = Arc::new(SyncMetrics::new());
        let state = SharedState::new(SyncState::new(&config, metrics.clone()));
        let supervisor =
            ConnectionSupervisor::new(config.reconnect_backoff, metrics.clone(), notifier.clone());
        Self {
            api,
            state,
            supervisor,
            notifier,
            metrics,
        }
    }

    /// Start the push channel. Every event is reconciled into the store in
    /// arrival order.
    pub fn start<T: PushTransport>(&self, transport: T) -> bool {
        let state = self.state.clone();
        self.supervisor.start(transport, move |event| {
            let poll_id = event.poll_id();
            let kind = event.kind();
            let outcome = state.mutate(|s| reconcile::reconcile(s, event));
            tracing::trace!(poll_id, kind, ?outcome, "push event reconciled");
        })
    }

    /// Reconcile one event directly, bypassing the push channel.
    pub fn reconcile(&self, event: RemoteEvent) -> Outcome {
        self.state.mutate(|s| reconcile::reconcile(s, event))
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.supervisor.is_shut_down() {
            return Err(CoreError::SessionClosed);
        }
        Ok(())
    }

    pub fn begin_vote(&self, poll_id: i64, option_id: i64) -> Result<AppliedMutation, CoreError> {
        self.ensure_open()?;
        let applied = self
            .state
            .try_mutate(|s| optimistic::apply_vote(s, poll_id, option_id))?;
        self.schedule_expiry(&applied);
        Ok(applied)
    }

    pub fn begin_like(&self, poll_id: i64) -> Result<AppliedMutation, CoreError> {
        self.ensure_open()?;
        let applied = self.state.try_mutate(|s| optimistic::apply_like(s, poll_id))?;
        self.schedule_expiry(&applied);
        Ok(applied)
    }

    pub fn begin_unlike(&self, poll_id: i64) -> Result<AppliedMutation, CoreError> {
        self.ensure_open()?;
        let applied = self.state.try_mutate(|s| optimistic::apply_unlike(s, poll_id))?;
        self.schedule_expiry(&applied);
        Ok(applied)
    }

    /// End the trust window once it elapses. A superseded handle makes the
    /// timer a no-op.
    fn schedule_expiry(&self, applied: &AppliedMutation) {
        let handle = applied.handle;
        let window = self.state.read(|s| s.tracker.window(handle.kind));
        let state = self.state.clone();
        self.supervisor.timers().schedule(handle, window, async move {
            if state.mutate(|s| s.tracker.expire(handle)) {
                tracing::debug!(
                    poll_id = handle.poll_id,
                    kind = %handle.kind,
                    seq = handle.seq,
                    "trust window elapsed"
                );
            }
        });
    }

    /// Send the request for an applied mutation. On failure the delta is
    /// undone, its pending entry removed and the user notified.
    pub async fn submit(&self, applied: AppliedMutation) -> Result<(), CoreError> {
        let poll_id = applied.poll_id();
        let result = match applied.delta {
            Delta::Vote { option_id } => self.api.vote(poll_id, option_id).await,
            Delta::Like => self.api.like_poll(poll_id).await,
            Delta::Unlike => self.api.unlike_poll(poll_id).await,
        };

        match result {
            Ok(_) => {
                self.notifier.notify(success_notice(&applied));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(poll_id, kind = %applied.kind(), error = %e, "request failed");
                self.state.mutate(|s| optimistic::rollback(s, &applied));
                self.supervisor.timers().cancel(applied.handle);
                self.notifier.notify(failure_notice(applied.delta));
                Err(CoreError::NetworkFailure(e))
            }
        }
    }

    pub async fn vote(&self, poll_id: i64, option_id: i64) -> Result<(), CoreError> {
        let applied = self
            .begin_vote(poll_id, option_id)
            .inspect_err(|e| self.report_rejected(e))?;
        self.submit(applied).await
    }

    pub async fn like(&self, poll_id: i64) -> Result<(), CoreError> {
        let applied = self
            .begin_like(poll_id)
            .inspect_err(|e| self.report_rejected(e))?;
        self.submit(applied).await
    }

    pub async fn unlike(&self, poll_id: i64) -> Result<(), CoreError> {
        let applied = self
            .begin_unlike(poll_id)
            .inspect_err(|e| self.report_rejected(e))?;
        self.submit(applied).await
    }

    /// Begin a like or an unlike depending on whether this session currently
    /// likes the poll.
    pub fn begin_toggle_like(&self, poll_id: i64) -> Result<AppliedMutation, CoreError> {
        if self.state.read(|s| s.store.is_liked(poll_id)) {
            self.begin_unlike(poll_id)
        } else {
            self.begin_like(poll_id)
        }
    }

    pub async fn toggle_like(&self, poll_id: i64) -> Result<(), CoreError> {
        let applied = self
            .begin_toggle_like(poll_id)
            .inspect_err(|e| self.report_rejected(e))?;
        self.submit(applied).await
    }

    fn report_rejected(&self, err: &CoreError) {
        if let CoreError::AlreadyPending { .. } = err {
            self.notifier.notify(Notification::new(
                NotificationLevel::Info,
                "Please wait, your previous action is still being processed",
            ));
        }
    }

    /// Reload the poll list. Polls with live speculative actions keep their
    /// current counters.
    pub async fn refresh_polls(&self) -> Result<(), CoreError> {
        self.ensure_open()?;
        let polls = self.api.list_polls().await?;
        tracing::debug!(count = polls.len(), "poll list refreshed");
        self.state.mutate(|s| reconcile::merge_listing(s, polls));
        Ok(())
    }

    /// Load one poll with its options into the focused slot.
    pub async fn focus_poll(&self, poll_id: i64) -> Result<(), CoreError> {
        self.ensure_open()?;
        let poll = self.api.get_poll(poll_id).await?;
        self.state.mutate(|s| reconcile::merge_fetched_poll(s, poll));
        Ok(())
    }

    pub fn clear_focus(&self) {
        self.state.mutate(|s| s.store.set_focused(None));
    }

    /// Create a poll. The list learns about it from the `poll_created` broadcast.
    pub async fn create_poll(&self, poll: &NewPoll) -> Result<Poll, CoreError> {
        self.ensure_open()?;
        let created = self.api.create_poll(poll).await?;
        tracing::info!(poll_id = created.id, "poll created");
        Ok(created)
    }

    pub fn snapshot(&self) -> ViewModelStore {
        self.state.snapshot()
    }

    /// Receiver bumped on every store mutation.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.state.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn connection_events(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe()
    }

    pub fn is_pending(&self, poll_id: i64, kind: ActionKind) -> bool {
        self.state.read(|s| s.tracker.is_pending(poll_id, kind))
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Logout teardown. Speculative counters stay as displayed; no further
    /// actions are accepted.
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
        self.state.mutate(|s| s.tracker.clear());
    }
}

fn success_notice(applied: &AppliedMutation) -> Notification {
    let message = match applied.delta {
        Delta::Vote { .. } => format!(
            "Vote recorded! You voted for: \"{}\"",
            applied.option_text.as_deref().unwrap_or_default()
        ),
        Delta::Like => "Poll liked!".to_string(),
        Delta::Unlike => "Poll unliked".to_string(),
    };
    Notification::new(NotificationLevel::Success, message)
}

fn failure_notice(delta: Delta) -> Notification {
    let message = match delta {
        Delta::Vote { .. } => "Failed to record your vote. Please try again.",
        Delta::Like | Delta::Unlike => "Failed to update like status",
    };
    Notification::new(NotificationLevel::Error, message)
}
