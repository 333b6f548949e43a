//! Command dispatch for the interactive loop.
//!
//! Nothing here awaits the network. A mutation writes its speculative delta
//! before `dispatch` returns and its request runs on a spawned task, so the
//! loop keeps rendering and reading input while the request is in flight.

use crate::command::{self, Command};
use pollsync_core::{AppliedMutation, CoreError, PollApi, PollSession};
use pollsync_models::NewPoll;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Run `cmd`. Returns the task carrying its network half, if one was started.
pub fn dispatch<A: PollApi>(
    session: &Arc<PollSession<A>>,
    cmd: Command,
) -> Option<JoinHandle<()>> {
    match cmd {
        Command::Vote { poll_id, option_id } => {
            submit(session, session.begin_vote(poll_id, option_id))
        }
        Command::Like(poll_id) => submit(session, session.begin_like(poll_id)),
        Command::Unlike(poll_id) => submit(session, session.begin_unlike(poll_id)),
        Command::Toggle(poll_id) => submit(session, session.begin_toggle_like(poll_id)),
        Command::Focus(poll_id) => {
            let session = session.clone();
            Some(tokio::spawn(async move {
                report(session.focus_poll(poll_id).await);
            }))
        }
        Command::Refresh => {
            let session = session.clone();
            Some(tokio::spawn(async move {
                report(session.refresh_polls().await);
            }))
        }
        Command::Create { title, options } => {
            let session = session.clone();
            Some(tokio::spawn(async move {
                let created = session
                    .create_poll(&NewPoll::new(title, None, options))
                    .await
                    .map(|poll| println!("created poll #{}", poll.id));
                report(created);
            }))
        }
        Command::Unfocus => {
            session.clear_focus();
            None
        }
        Command::Stats => {
            println!("{:#?}", session.metrics());
            None
        }
        Command::Help => {
            println!("{}", command::HELP);
            None
        }
        Command::Quit => None,
    }
}

fn submit<A: PollApi>(
    session: &Arc<PollSession<A>>,
    begun: Result<AppliedMutation, CoreError>,
) -> Option<JoinHandle<()>> {
    match begun {
        Ok(applied) => {
            let session = session.clone();
            Some(tokio::spawn(async move {
                report(session.submit(applied).await);
            }))
        }
        Err(e) => {
            eprintln!("{e}");
            None
        }
    }
}

fn report(result: Result<(), CoreError>) {
    if let Err(e) = result {
        eprintln!("{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;
    use chrono::{TimeZone, Utc};
    use pollsync_core::{ActionKind, EngineConfig, TracingNotifier, TransportError};
    use pollsync_models::{Ack, Creator, Poll, PollOption, PollSummary};

    fn poll() -> Poll {
        Poll {
            id: 1,
            title: "Lunch?".into(),
            description: None,
            creator: Creator {
                id: 3,
                username: "ana".into(),
            },
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            options: vec![
                PollOption {
                    id: 10,
                    option_text: "pizza".into(),
                    vote_count: 1,
                },
                PollOption {
                    id: 11,
                    option_text: "sushi".into(),
                    vote_count: 3,
                },
            ],
            total_votes: 4,
            total_likes: 2,
            is_active: true,
        }
    }

    /// Serves reads, never answers writes.
    struct StalledApi;

    impl PollApi for StalledApi {
        async fn create_poll(&self, _poll: &NewPoll) -> Result<Poll, TransportError> {
            std::future::pending().await
        }

        async fn vote(&self, _poll_id: i64, _option_id: i64) -> Result<Ack, TransportError> {
            std::future::pending().await
        }

        async fn like_poll(&self, _poll_id: i64) -> Result<Ack, TransportError> {
            std::future::pending().await
        }

        async fn unlike_poll(&self, _poll_id: i64) -> Result<Ack, TransportError> {
            std::future::pending().await
        }

        async fn list_polls(&self) -> Result<Vec<PollSummary>, TransportError> {
            Ok(vec![poll().summary()])
        }

        async fn get_poll(&self, _poll_id: i64) -> Result<Poll, TransportError> {
            Ok(poll())
        }
    }

    async fn session() -> Arc<PollSession<StalledApi>> {
        let session = Arc::new(PollSession::new(
            StalledApi,
            Arc::new(TracingNotifier),
            EngineConfig::default(),
        ));
        session.refresh_polls().await.expect("refresh");
        session.focus_poll(1).await.expect("focus");
        session
    }

    #[tokio::test]
    async fn vote_is_visible_while_its_request_is_in_flight() {
        let session = session().await;
        let mut changes = session.changes();
        changes.mark_unchanged();

        let request = dispatch(
            &session,
            Command::Vote {
                poll_id: 1,
                option_id: 10,
            },
        )
        .expect("request started");

        assert!(changes.has_changed().expect("session alive"));
        let store = session.snapshot();
        assert_eq!(store.option_count(1, 10), Some(2));
        assert_eq!(store.total_votes(1), Some(5));
        assert!(render(&store, session.connection_state()).contains("[10] pizza  2 (40%)"));

        tokio::task::yield_now().await;
        assert!(!request.is_finished());
        request.abort();
        session.shutdown();
    }

    #[tokio::test]
    async fn second_vote_is_rejected_while_the_first_is_in_flight() {
        let session = session().await;
        let first = dispatch(
            &session,
            Command::Vote {
                poll_id: 1,
                option_id: 10,
            },
        )
        .expect("first request started");
        tokio::task::yield_now().await;

        let second = dispatch(
            &session,
            Command::Vote {
                poll_id: 1,
                option_id: 11,
            },
        );

        assert!(second.is_none());
        assert!(session.is_pending(1, ActionKind::Vote));
        let store = session.snapshot();
        assert_eq!(store.option_count(1, 10), Some(2));
        assert_eq!(store.option_count(1, 11), Some(3));
        first.abort();
        session.shutdown();
    }

    #[tokio::test]
    async fn like_applies_before_the_request_answers() {
        let session = session().await;
        let request = dispatch(&session, Command::Toggle(1)).expect("request started");

        let store = session.snapshot();
        assert!(store.is_liked(1));
        assert_eq!(store.total_likes(1), Some(3));
        assert!(dispatch(&session, Command::Like(1)).is_none());
        request.abort();
        session.shutdown();
    }

    #[tokio::test]
    async fn local_commands_start_no_request() {
        let session = session().await;
        assert!(dispatch(&session, Command::Unfocus).is_none());
        assert!(session.snapshot().focused().is_none());
        assert!(dispatch(&session, Command::Help).is_none());
        session.shutdown();
    }
}
