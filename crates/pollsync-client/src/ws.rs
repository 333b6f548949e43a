use crate::error::{parse_url, ClientError};
use futures_util::StreamExt;
use pollsync_core::{PushConnection, PushTransport, TransportError};
use pollsync_models::RemoteEvent;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Dials the server's broadcast WebSocket.
#[derive(Debug, Clone)]
pub struct WsPushTransport {
    url: Url,
    connect_timeout: Duration,
}

impl WsPushTransport {
    pub fn new(ws_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            url: parse_url(ws_url, &["ws", "wss"])?,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl PushTransport for WsPushTransport {
    type Connection = WsConnection;

    async fn connect(&self) -> Result<WsConnection, TransportError> {
        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok((stream, _))) => {
                tracing::debug!(url = %self.url, "push channel handshake complete");
                Ok(WsConnection { stream })
            }
            Ok(Err(e)) => Err(TransportError::Http(e.to_string())),
            Err(_) => Err(TransportError::Http(format!(
                "connect timed out after {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PushConnection for WsConnection {
    async fn next_event(&mut self) -> Option<Result<RemoteEvent, TransportError>> {
        while let Some(frame) = self.stream.next().await {
            let event = match frame {
                Ok(Message::Text(text)) => decode_frame(text.as_str()),
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => decode_frame(text),
                    Err(_) => {
                        tracing::warn!(len = bytes.len(), "skipping non-utf8 push frame");
                        None
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "push channel closed by server");
                    return None;
                }
                // Pings are answered by tungstenite itself.
                Ok(_) => None,
                Err(e) => return Some(Err(TransportError::Http(e.to_string()))),
            };
            if let Some(event) = event {
                return Some(Ok(event));
            }
        }
        None
    }
}

/// Decode one text frame. Unknown kinds and malformed payloads are skipped
/// rather than tearing the connection down.
fn decode_frame(text: &str) -> Option<RemoteEvent> {
    match RemoteEvent::from_json(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable push frame");
            None
        }
    }
}
