use crate::poll::{Poll, PollSummary};
use crate::user::Creator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative update delivered over the push channel.
///
/// Wire form is the server's envelope `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RemoteEvent {
    #[serde(rename = "poll_created")]
    PollCreated { poll: CreatedPoll },
    #[serde(rename = "poll_vote")]
    PollVoteUpdated(PollVoteUpdate),
    #[serde(rename = "poll_like")]
    PollLikeUpdated(PollLikeUpdate),
}

impl RemoteEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn poll_id(&self) -> i64 {
        match self {
            RemoteEvent::PollCreated { poll } => poll.id,
            RemoteEvent::PollVoteUpdated(update) => update.poll_id,
            RemoteEvent::PollLikeUpdated(update) => update.poll_id,
        }
    }

    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteEvent::PollCreated { .. } => "poll_created",
            RemoteEvent::PollVoteUpdated(_) => "poll_vote",
            RemoteEvent::PollLikeUpdated(_) => "poll_like",
        }
    }
}

/// Payload of `poll_created`.
///
/// Accepts both the full poll shape (`creator` object, `created_at`) and the
/// list shape the server broadcasts (`creator_username`, no timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPoll {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_votes: u32,
    #[serde(default)]
    pub total_likes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
}

impl CreatedPoll {
    /// List entry for this poll. A payload without a timestamp is dated `received_at`.
    pub fn summary_at(&self, received_at: DateTime<Utc>) -> PollSummary {
        let creator_username = self
            .creator_username
            .clone()
            .or_else(|| self.creator.as_ref().map(|c| c.username.clone()))
            .unwrap_or_default();
        PollSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            created_at: self.created_at.unwrap_or(received_at),
            total_votes: self.total_votes,
            total_likes: self.total_likes,
            creator_username,
        }
    }

    pub fn summary(&self) -> PollSummary {
        self.summary_at(Utc::now())
    }
}

impl From<&Poll> for CreatedPoll {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id,
            title: poll.title.clone(),
            description: poll.description.clone(),
            created_at: Some(poll.created_at),
            total_votes: poll.total_votes,
            total_likes: poll.total_likes,
            creator_username: Some(poll.creator.username.clone()),
            creator: Some(poll.creator.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVoteUpdate {
    pub poll_id: i64,
    pub total_votes: u32,
    #[serde(default)]
    pub options: Vec<OptionCount>,
    /// Single-option form some servers broadcast instead of `options`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u32>,
}

impl PollVoteUpdate {
    pub fn new(poll_id: i64, total_votes: u32, options: Vec<OptionCount>) -> Self {
        Self {
            poll_id,
            total_votes,
            options,
            option_id: None,
            vote_count: None,
        }
    }

    /// Per-option counters carried by this update, in either wire form.
    pub fn counts(&self) -> Vec<OptionCount> {
        if !self.options.is_empty() {
            return self.options.clone();
        }
        match (self.option_id, self.vote_count) {
            (Some(id), Some(vote_count)) => vec![OptionCount { id, vote_count }],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    pub id: i64,
    pub vote_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollLikeUpdate {
    pub poll_id: i64,
    pub total_likes: u32,
}
