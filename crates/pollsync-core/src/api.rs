//! Seams for the request client and push-channel transport.
//!
//! The engine never talks to the network directly; hosts plug in
//! implementations (see the `pollsync-client` crate for HTTP and WebSocket ones).

use pollsync_models::{Ack, NewPoll, Poll, PollSummary, RemoteEvent};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("connection closed")]
    Closed,
}

/// Outbound request client. Response bodies are never trusted for counter state.
pub trait PollApi: Send + Sync + 'static {
    fn create_poll(&self, poll: &NewPoll)
        -> impl Future<Output = Result<Poll, TransportError>> + Send;

    fn vote(&self, poll_id: i64, option_id: i64)
        -> impl Future<Output = Result<Ack, TransportError>> + Send;

    fn like_poll(&self, poll_id: i64) -> impl Future<Output = Result<Ack, TransportError>> + Send;

    fn unlike_poll(&self, poll_id: i64) -> impl Future<Output = Result<Ack, TransportError>> + Send;

    fn list_polls(&self) -> impl Future<Output = Result<Vec<PollSummary>, TransportError>> + Send;

    fn get_poll(&self, poll_id: i64) -> impl Future<Output = Result<Poll, TransportError>> + Send;
}

/// Dials the push channel.
pub trait PushTransport: Send + Sync + 'static {
    type Connection: PushConnection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// One live push-channel connection.
///
/// `next_event` yields `None` when the peer closed the channel and
/// `Some(Err(_))` on a transport failure; both end the connection.
pub trait PushConnection: Send + 'static {
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Option<Result<RemoteEvent, TransportError>>> + Send;
}
