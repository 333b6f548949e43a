pub mod api;
pub mod error;
pub mod notify;
pub mod observability;
pub mod optimistic;
pub mod pending;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod store;
pub mod supervisor;
pub mod timers;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use api::{PollApi, PushConnection, PushTransport, TransportError};
pub use error::CoreError;
pub use notify::{Notification, NotificationLevel, Notifier, TracingNotifier};
pub use observability::SyncMetricsSnapshot;
pub use optimistic::AppliedMutation;
pub use pending::ActionKind;
pub use reconcile::Outcome;
pub use session::PollSession;
pub use store::ViewModelStore;
pub use supervisor::ConnectionState;

/// Default trust window for a vote.
pub const DEFAULT_VOTE_TRUST_WINDOW: Duration = Duration::from_millis(3000);
/// Default trust window for a like or unlike.
pub const DEFAULT_LIKE_TRUST_WINDOW: Duration = Duration::from_millis(2000);
/// Fixed delay between push-channel reconnect attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_millis(5000);

/// Timing knobs of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub vote_trust_window: Duration,
    pub like_trust_window: Duration,
    pub reconnect_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vote_trust_window: DEFAULT_VOTE_TRUST_WINDOW,
            like_trust_window: DEFAULT_LIKE_TRUST_WINDOW,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
        }
    }
}
