//! Fixtures and in-memory collaborators shared by the unit tests.

use crate::api::{PollApi, PushConnection, PushTransport, TransportError};
use crate::observability::SyncMetrics;
use crate::state::SyncState;
use crate::EngineConfig;
use chrono::{DateTime, TimeZone, Utc};
use pollsync_models::{
    Ack, Creator, NewPoll, OptionCount, Poll, PollLikeUpdate, PollOption, PollSummary,
    PollVoteUpdate, RemoteEvent,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub fn test_state() -> SyncState {
    SyncState::new(&EngineConfig::default(), Arc::new(SyncMetrics::new()))
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

/// Poll whose `total_votes` is the sum of `options`.
pub fn sample_poll(id: i64, options: &[(i64, u32)], total_likes: u32) -> Poll {
    Poll {
        id,
        title: format!("poll {id}"),
        description: None,
        creator: Creator {
            id: 3,
            username: "ana".into(),
        },
        created_at: created_at(),
        options: options
            .iter()
            .map(|&(option_id, vote_count)| PollOption {
                id: option_id,
                option_text: format!("option {option_id}"),
                vote_count,
            })
            .collect(),
        total_votes: options.iter().map(|(_, count)| count).sum(),
        total_likes,
        is_active: true,
    }
}

pub fn sample_summary(id: i64, total_votes: u32, total_likes: u32) -> PollSummary {
    PollSummary {
        id,
        title: format!("poll {id}"),
        description: None,
        created_at: created_at(),
        total_votes,
        total_likes,
        creator_username: "ana".into(),
    }
}

pub fn vote_event(poll_id: i64, total_votes: u32, options: &[(i64, u32)]) -> RemoteEvent {
    RemoteEvent::PollVoteUpdated(PollVoteUpdate::new(
        poll_id,
        total_votes,
        options
            .iter()
            .map(|&(id, vote_count)| OptionCount { id, vote_count })
            .collect(),
    ))
}

pub fn like_event(poll_id: i64, total_likes: u32) -> RemoteEvent {
    RemoteEvent::PollLikeUpdated(PollLikeUpdate {
        poll_id,
        total_likes,
    })
}

#[derive(Default)]
struct FakeApiInner {
    polls: BTreeMap<i64, Poll>,
    calls: Vec<String>,
    fail: bool,
}

/// In-memory `PollApi`. Records every call; fails all of them when told to.
/// Never changes counters, since only the push channel is authoritative.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<FakeApiInner>>,
}

impl FakeApi {
    pub fn with_polls(polls: impl IntoIterator<Item = Poll>) -> Self {
        let api = Self::default();
        api.inner.lock().unwrap().polls = polls.into_iter().map(|p| (p.id, p)).collect();
        api
    }

    pub fn set_fail(&self, fail: bool) {
        self.inner.lock().unwrap().fail = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if inner.fail {
            return Err(TransportError::Status {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(())
    }

    fn lookup(&self, poll_id: i64) -> Result<Poll, TransportError> {
        self.inner
            .lock()
            .unwrap()
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or(TransportError::Status {
                status: 404,
                message: "Poll not found".into(),
            })
    }
}

impl PollApi for FakeApi {
    fn create_poll(
        &self,
        poll: &NewPoll,
    ) -> impl Future<Output = Result<Poll, TransportError>> + Send {
        let result = self.record(format!("create {}", poll.title)).map(|()| {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.polls.keys().next_back().copied().unwrap_or(0) + 1;
            let options: Vec<(i64, u32)> = (0..poll.options.len() as i64)
                .map(|i| (id * 10 + i, 0))
                .collect();
            let created = sample_poll(id, &options, 0);
            inner.polls.insert(id, created.clone());
            created
        });
        async move { result }
    }

    fn vote(
        &self,
        poll_id: i64,
        option_id: i64,
    ) -> impl Future<Output = Result<Ack, TransportError>> + Send {
        let result = self.record(format!("vote {poll_id} {option_id}"));
        async move {
            result.map(|()| Ack {
                message: "Vote recorded".into(),
            })
        }
    }

    fn like_poll(&self, poll_id: i64) -> impl Future<Output = Result<Ack, TransportError>> + Send {
        let result = self.record(format!("like {poll_id}"));
        async move { result.map(|()| Ack::default()) }
    }

    fn unlike_poll(
        &self,
        poll_id: i64,
    ) -> impl Future<Output = Result<Ack, TransportError>> + Send {
        let result = self.record(format!("unlike {poll_id}"));
        async move { result.map(|()| Ack::default()) }
    }

    fn list_polls(&self) -> impl Future<Output = Result<Vec<PollSummary>, TransportError>> + Send {
        let result = self.record("list".into()).map(|()| {
            let inner = self.inner.lock().unwrap();
            inner.polls.values().rev().map(Poll::summary).collect()
        });
        async move { result }
    }

    fn get_poll(&self, poll_id: i64) -> impl Future<Output = Result<Poll, TransportError>> + Send {
        let result = self
            .record(format!("get {poll_id}"))
            .and_then(|()| self.lookup(poll_id));
        async move { result }
    }
}

pub type EventResult = Result<RemoteEvent, TransportError>;
type DialOutcome = Result<mpsc::UnboundedReceiver<EventResult>, TransportError>;

/// Push transport driven by a test through its `Dialer`.
///
/// Each `connect` waits for the dialer to accept or refuse; accepting hands
/// the test a sender for that connection's events. Dropping the sender closes
/// the connection from the server side.
pub struct ChannelTransport {
    outcomes: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<DialOutcome>>>,
}

pub struct Dialer {
    outcomes: mpsc::UnboundedSender<DialOutcome>,
}

pub struct ChannelConnection {
    events: mpsc::UnboundedReceiver<EventResult>,
}

impl ChannelTransport {
    pub fn new() -> (Self, Dialer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                outcomes: Arc::new(tokio::sync::Mutex::new(rx)),
            },
            Dialer { outcomes: tx },
        )
    }
}

impl Dialer {
    pub fn accept(&self) -> mpsc::UnboundedSender<EventResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.outcomes.send(Ok(rx));
        tx
    }

    pub fn refuse(&self) {
        let _ = self
            .outcomes
            .send(Err(TransportError::Http("connection refused".into())));
    }
}

impl PushTransport for ChannelTransport {
    type Connection = ChannelConnection;

    fn connect(&self) -> impl Future<Output = Result<ChannelConnection, TransportError>> + Send {
        let outcomes = self.outcomes.clone();
        async move {
            let mut outcomes = outcomes.lock().await;
            match outcomes.recv().await {
                Some(Ok(events)) => Ok(ChannelConnection { events }),
                Some(Err(e)) => Err(e),
                None => Err(TransportError::Closed),
            }
        }
    }
}

impl PushConnection for ChannelConnection {
    fn next_event(&mut self) -> impl Future<Output = Option<EventResult>> + Send {
        self.events.recv()
    }
}
