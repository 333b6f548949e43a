use crate::api::TransportError;
use crate::pending::ActionKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A conflicting action on the same poll is still inside its trust window.
    #[error("a {kind} on poll {poll_id} is already pending")]
    AlreadyPending { poll_id: i64, kind: ActionKind },
    #[error("option {option_id} does not belong to poll {poll_id}")]
    InvalidOption { poll_id: i64, option_id: i64 },
    #[error("poll {0} is not loaded")]
    UnknownPoll(i64),
    #[error("request failed: {0}")]
    NetworkFailure(#[from] TransportError),
    #[error("push channel lost: {0}")]
    ConnectionLost(String),
    #[error("session closed")]
    SessionClosed,
}

impl CoreError {
    /// Local errors are raised before the store is touched and never roll anything back.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            CoreError::AlreadyPending { .. }
                | CoreError::InvalidOption { .. }
                | CoreError::UnknownPoll(_)
                | CoreError::SessionClosed
        )
    }
}
