use crate::error::{parse_url, ClientError};
use pollsync_core::{PollApi, TransportError};
use pollsync_models::{Ack, NewPoll, Poll, PollSummary, VoteRequest};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const USER_AGENT: &str = concat!("pollsync/", env!("CARGO_PKG_VERSION"));

/// REST client for the polls API.
///
/// Reads are retried with exponential backoff on server errors and transport
/// failures. Mutations are sent once; a retried vote could be counted twice.
#[derive(Debug, Clone)]
pub struct HttpPollClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl HttpPollClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Self::with_client(api_url, token, http)
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(api_url: &str, token: Option<String>, http: Client) -> Result<Self, ClientError> {
        let mut base = parse_url(api_url, &["http", "https"])?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Http(format!("bad endpoint {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET request with exponential backoff retry.
    async fn get_with_retry(&self, url: Url) -> Result<Response, TransportError> {
        let mut last_err = TransportError::Http("no attempts made".to_string());
        for attempt in 0..MAX_RETRIES {
            let request = self.authorize(self.http.get(url.clone()));
            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status().is_server_error() => {
                    last_err = error_from_response(resp).await;
                }
                Ok(resp) => return Err(error_from_response(resp).await),
                Err(e) => {
                    last_err = TransportError::Http(e.to_string());
                }
            }
            if attempt + 1 < MAX_RETRIES {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                tracing::debug!(%url, attempt, delay_ms = delay.as_millis() as u64, "retrying read");
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_err)
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let resp = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp).await)
        }
    }
}

impl PollApi for HttpPollClient {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll, TransportError> {
        let url = self.endpoint("polls/")?;
        let resp = self.send_once(self.http.post(url).json(poll)).await?;
        decode(resp).await
    }

    async fn vote(&self, poll_id: i64, option_id: i64) -> Result<Ack, TransportError> {
        let url = self.endpoint(&format!("polls/{poll_id}/vote"))?;
        let body = VoteRequest { poll_id, option_id };
        let resp = self.send_once(self.http.post(url).json(&body)).await?;
        Ok(read_ack(resp).await)
    }

    async fn like_poll(&self, poll_id: i64) -> Result<Ack, TransportError> {
        let url = self.endpoint(&format!("polls/{poll_id}/like"))?;
        let resp = self.send_once(self.http.post(url)).await?;
        Ok(read_ack(resp).await)
    }

    async fn unlike_poll(&self, poll_id: i64) -> Result<Ack, TransportError> {
        let url = self.endpoint(&format!("polls/{poll_id}/like"))?;
        let resp = self.send_once(self.http.delete(url)).await?;
        Ok(read_ack(resp).await)
    }

    async fn list_polls(&self) -> Result<Vec<PollSummary>, TransportError> {
        let resp = self.get_with_retry(self.endpoint("polls/")?).await?;
        decode(resp).await
    }

    async fn get_poll(&self, poll_id: i64) -> Result<Poll, TransportError> {
        let resp = self
            .get_with_retry(self.endpoint(&format!("polls/{poll_id}"))?)
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    resp.json::<T>()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

/// Acks carry nothing the engine relies on, so an odd body is not an error.
async fn read_ack(resp: Response) -> Ack {
    let body = resp.text().await.unwrap_or_default();
    parse_ack(&body)
}

fn parse_ack(body: &str) -> Ack {
    serde_json::from_str(body).unwrap_or_default()
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

async fn error_from_response(resp: Response) -> TransportError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    TransportError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

/// Human-readable message from an error body. The API reports errors as
/// `{"detail": "..."}`, or a list of field errors on validation failures.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.detail {
            serde_json::Value::String(detail) => detail,
            other => other.to_string(),
        };
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(200).collect();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn endpoints_resolve_under_the_api_prefix() {
        for base in ["http://localhost:8000/api", "http://localhost:8000/api/"] {
            let client = HttpPollClient::new(base, None).expect("client");
            assert_eq!(
                client.endpoint("polls/").unwrap().as_str(),
                "http://localhost:8000/api/polls/"
            );
            assert_eq!(
                client.endpoint("polls/7/vote").unwrap().as_str(),
                "http://localhost:8000/api/polls/7/vote"
            );
        }
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            HttpPollClient::new("ws://localhost:8000/api", None),
            Err(ClientError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            HttpPollClient::new("not a url", None),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn error_message_prefers_detail() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"detail":"You have already voted on this poll"}"#),
            "You have already voted on this poll"
        );
        assert!(error_message(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","option_id"],"msg":"field required"}]}"#
        )
        .contains("field required"));
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn ack_tolerates_any_body() {
        assert_eq!(parse_ack(r#"{"message":"Poll liked"}"#).message, "Poll liked");
        assert_eq!(parse_ack("null"), Ack::default());
        assert_eq!(parse_ack(""), Ack::default());
    }

    /// Serves one canned response per connection and records request lines.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}/api"), seen)
    }

    fn local_client(base: &str, token: Option<String>) -> HttpPollClient {
        let http = Client::builder().no_proxy().build().unwrap();
        HttpPollClient::with_client(base, token, http).unwrap()
    }

    /// Request line plus the authorization header, if any.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break buf.len();
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let mut summary = head.lines().next().unwrap_or_default().to_string();
        if let Some(auth) = head
            .lines()
            .find(|l| l.to_ascii_lowercase().starts_with("authorization:"))
        {
            summary.push_str(" | ");
            summary.push_str(auth.trim());
        }
        summary
    }

    const LISTING: &str = r#"[{"id":1,"title":"Lunch?","description":null,"created_at":"2024-05-01T10:00:00","total_votes":3,"total_likes":1,"creator_username":"ana"}]"#;

    #[tokio::test]
    async fn list_is_retried_after_server_errors() {
        let (base, seen) = serve(vec![(503, r#"{"detail":"busy"}"#), (200, LISTING)]).await;
        let client = local_client(&base, Some("secret".into()));

        let polls = client.list_polls().await.expect("list");
        assert_eq!(polls.len(), 1);
        assert_eq!(polls[0].total_votes, 3);

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].starts_with("GET /api/polls/ HTTP/1.1"));
        assert!(seen[1].ends_with("Bearer secret"));
    }

    #[tokio::test]
    async fn rejected_vote_is_not_retried() {
        let (base, seen) = serve(vec![
            (400, r#"{"detail":"You have already voted on this poll"}"#),
            (200, "{}"),
        ])
        .await;
        let client = local_client(&base, None);

        let err = client.vote(1, 10).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 400,
                message: "You have already voted on this poll".into()
            }
        );
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["POST /api/polls/1/vote HTTP/1.1".to_string()]);
    }

    #[tokio::test]
    async fn unlike_uses_delete() {
        let (base, seen) = serve(vec![(200, r#"{"message":"Poll unliked"}"#)]).await;
        let client = local_client(&base, None);
        let ack = client.unlike_poll(4).await.expect("unlike");
        assert_eq!(ack.message, "Poll unliked");
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec!["DELETE /api/polls/4/like HTTP/1.1".to_string()]
        );
    }
}
