//! Network collaborators for a `pollsync-core` session: a REST request
//! client and a WebSocket push transport.

pub mod error;
pub mod http;
pub mod ws;

pub use error::ClientError;
pub use http::HttpPollClient;
pub use ws::{WsConnection, WsPushTransport};
