use pollsync_core::{ConnectionState, ViewModelStore};
use std::fmt::Write;

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => "live",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Disconnected => "offline",
    }
}

/// Plain-text view of the store.
pub fn render(store: &ViewModelStore, state: ConnectionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {} polls", connection_label(state), store.polls().len());
    for poll in store.polls() {
        let liked = if store.is_liked(poll.id) { " *" } else { "" };
        let _ = writeln!(
            out,
            "  #{:<4} {}  by {}  votes {}  likes {}{}",
            poll.id, poll.title, poll.creator_username, poll.total_votes, poll.total_likes, liked
        );
    }

    if let Some(poll) = store.focused() {
        let _ = writeln!(out, "> #{} {}", poll.id, poll.title);
        if let Some(description) = poll.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "  {description}");
        }
        for option in &poll.options {
            let percent = if poll.total_votes == 0 {
                0
            } else {
                option.vote_count * 100 / poll.total_votes
            };
            let _ = writeln!(
                out,
                "    [{}] {}  {} ({}%)",
                option.id, option.option_text, option.vote_count, percent
            );
        }
        let _ = writeln!(out, "  total {}  likes {}", poll.total_votes, poll.total_likes);
    }
    out
}
