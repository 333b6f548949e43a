pub mod event;
pub mod poll;
pub mod timestamp;
pub mod user;

pub use event::{CreatedPoll, OptionCount, PollLikeUpdate, PollVoteUpdate, RemoteEvent};
pub use poll::{Ack, NewPoll, NewPollOption, Poll, PollOption, PollSummary, VoteRequest};
pub use user::Creator;
