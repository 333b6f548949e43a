use pollsync_models::RemoteEvent;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session sync counters.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    events_total: AtomicU64,
    polls_created: AtomicU64,
    vote_updates: AtomicU64,
    like_updates: AtomicU64,
    echoes_suppressed: AtomicU64,
    overrides: AtomicU64,
    verbatim_applies: AtomicU64,
    rollbacks: AtomicU64,
    reconnect_attempts: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_received(&self, event: &RemoteEvent) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
        let counter = match event {
            RemoteEvent::PollCreated { .. } => &self.polls_created,
            RemoteEvent::PollVoteUpdated(_) => &self.vote_updates,
            RemoteEvent::PollLikeUpdated(_) => &self.like_updates,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn echo_suppressed(&self) {
        self.echoes_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn override_applied(&self) {
        self.overrides.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verbatim_applied(&self) {
        self.verbatim_applies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rolled_back(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnect_attempted(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            events_total: self.events_total.load(Ordering::Relaxed),
            polls_created: self.polls_created.load(Ordering::Relaxed),
            vote_updates: self.vote_updates.load(Ordering::Relaxed),
            like_updates: self.like_updates.load(Ordering::Relaxed),
            echoes_suppressed: self.echoes_suppressed.load(Ordering::Relaxed),
            overrides: self.overrides.load(Ordering::Relaxed),
            verbatim_applies: self.verbatim_applies.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    pub events_total: u64,
    pub polls_created: u64,
    pub vote_updates: u64,
    pub like_updates: u64,
    pub echoes_suppressed: u64,
    pub overrides: u64,
    pub verbatim_applies: u64,
    pub rollbacks: u64,
    pub reconnect_attempts: u64,
}

impl SyncMetricsSnapshot {
    /// Count for a wire event kind such as `poll_vote`.
    pub fn events_of(&self, kind: &str) -> u64 {
        match kind {
            "poll_created" => self.polls_created,
            "poll_vote" => self.vote_updates,
            "poll_like" => self.like_updates,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollsync_models::{PollLikeUpdate, PollVoteUpdate};

    #[test]
    fn events_are_counted_per_kind() {
        let metrics = SyncMetrics::new();
        let vote = RemoteEvent::PollVoteUpdated(PollVoteUpdate::new(1, 3, Vec::new()));
        let like = RemoteEvent::PollLikeUpdated(PollLikeUpdate {
            poll_id: 1,
            total_likes: 2,
        });

        metrics.event_received(&vote);
        metrics.event_received(&vote);
        metrics.event_received(&like);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_total, 3);
        assert_eq!(snapshot.vote_updates, 2);
        assert_eq!(snapshot.events_of(like.kind()), 1);
        assert_eq!(snapshot.events_of("poll_created"), 0);
        assert_eq!(snapshot.events_of("user_joined"), 0);
    }

    #[test]
    fn outcome_counters_accumulate() {
        let metrics = SyncMetrics::new();
        metrics.echo_suppressed();
        metrics.echo_suppressed();
        metrics.override_applied();
        metrics.rolled_back();
        metrics.reconnect_attempted();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.echoes_suppressed, 2);
        assert_eq!(snapshot.overrides, 1);
        assert_eq!(snapshot.verbatim_applies, 0);
        assert_eq!(snapshot.rollbacks, 1);
        assert_eq!(snapshot.reconnect_attempts, 1);
    }
}
