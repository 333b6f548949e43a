use pollsync_models::{Poll, PollSummary};
use std::collections::BTreeSet;

/// Denormalized poll state read by renderers.
///
/// Holds the poll list, at most one focused poll with its options, and the
/// set of polls this session has liked. Only the optimistic applier and the
/// reconciler write to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewModelStore {
    polls: Vec<PollSummary>,
    focused: Option<Poll>,
    liked: BTreeSet<i64>,
}

impl ViewModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polls(&self) -> &[PollSummary] {
        &self.polls
    }

    pub fn summary(&self, poll_id: i64) -> Option<&PollSummary> {
        self.polls.iter().find(|p| p.id == poll_id)
    }

    pub fn summary_mut(&mut self, poll_id: i64) -> Option<&mut PollSummary> {
        self.polls.iter_mut().find(|p| p.id == poll_id)
    }

    pub fn focused(&self) -> Option<&Poll> {
        self.focused.as_ref()
    }

    /// The focused poll, only if it is `poll_id`.
    pub fn focused_poll(&self, poll_id: i64) -> Option<&Poll> {
        self.focused.as_ref().filter(|p| p.id == poll_id)
    }

    pub fn focused_poll_mut(&mut self, poll_id: i64) -> Option<&mut Poll> {
        self.focused.as_mut().filter(|p| p.id == poll_id)
    }

    /// Whether the poll is held in either the list or the focused slot.
    pub fn contains(&self, poll_id: i64) -> bool {
        self.summary(poll_id).is_some() || self.focused_poll(poll_id).is_some()
    }

    pub fn replace_polls(&mut self, polls: Vec<PollSummary>) {
        self.polls = polls;
    }

    /// Put `summary` at the head of the list, dropping any older copy.
    pub fn insert_head(&mut self, summary: PollSummary) {
        self.polls.retain(|p| p.id != summary.id);
        self.polls.insert(0, summary);
    }

    pub fn set_focused(&mut self, poll: Option<Poll>) {
        self.focused = poll;
    }

    pub fn is_liked(&self, poll_id: i64) -> bool {
        self.liked.contains(&poll_id)
    }

    pub fn set_liked(&mut self, poll_id: i64, liked: bool) {
        if liked {
            self.liked.insert(poll_id);
        } else {
            self.liked.remove(&poll_id);
        }
    }

    /// Current `total_votes`, preferring the focused copy.
    pub fn total_votes(&self, poll_id: i64) -> Option<u32> {
        self.focused_poll(poll_id)
            .map(|p| p.total_votes)
            .or_else(|| self.summary(poll_id).map(|p| p.total_votes))
    }

    /// Current `total_likes`, preferring the focused copy.
    pub fn total_likes(&self, poll_id: i64) -> Option<u32> {
        self.focused_poll(poll_id)
            .map(|p| p.total_likes)
            .or_else(|| self.summary(poll_id).map(|p| p.total_likes))
    }

    pub fn set_total_votes(&mut self, poll_id: i64, total_votes: u32) {
        if let Some(summary) = self.summary_mut(poll_id) {
            summary.total_votes = total_votes;
        }
        if let Some(poll) = self.focused_poll_mut(poll_id) {
            poll.total_votes = total_votes;
        }
    }

    pub fn set_total_likes(&mut self, poll_id: i64, total_likes: u32) {
        if let Some(summary) = self.summary_mut(poll_id) {
            summary.total_likes = total_likes;
        }
        if let Some(poll) = self.focused_poll_mut(poll_id) {
            poll.total_likes = total_likes;
        }
    }

    /// Returns false when the option is not part of the focused poll.
    pub fn set_option_count(&mut self, poll_id: i64, option_id: i64, vote_count: u32) -> bool {
        match self
            .focused_poll_mut(poll_id)
            .and_then(|p| p.option_mut(option_id))
        {
            Some(option) => {
                option.vote_count = vote_count;
                true
            }
            None => false,
        }
    }

    pub fn option_count(&self, poll_id: i64, option_id: i64) -> Option<u32> {
        self.focused_poll(poll_id)
            .and_then(|p| p.option(option_id))
            .map(|o| o.vote_count)
    }
}
