use crate::user::Creator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub creator: Creator,
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub total_votes: u32,
    #[serde(default)]
    pub total_likes: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Poll {
    pub fn option(&self, option_id: i64) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn option_mut(&mut self, option_id: i64) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.id == option_id)
    }

    /// Sum of all per-option counters. Equals `total_votes` once reconciled.
    pub fn option_sum(&self) -> u32 {
        self.options.iter().map(|o| o.vote_count).sum()
    }

    pub fn summary(&self) -> PollSummary {
        PollSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            total_votes: self.total_votes,
            total_likes: self.total_likes,
            creator_username: self.creator.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: i64,
    pub option_text: String,
    #[serde(default)]
    pub vote_count: u32,
}

/// List-view representation returned by the poll index endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total_votes: u32,
    #[serde(default)]
    pub total_likes: u32,
    pub creator_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPoll {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub options: Vec<NewPollOption>,
}

impl NewPoll {
    pub fn new<I, S>(title: impl Into<String>, description: Option<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            description,
            options: options
                .into_iter()
                .map(|text| NewPollOption {
                    option_text: text.into(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPollOption {
    pub option_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub poll_id: i64,
    pub option_id: i64,
}

/// Acknowledgement body of the vote/like/unlike endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}
