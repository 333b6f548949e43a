use crate::api::{PushConnection, PushTransport};
use crate::error::CoreError;
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::observability::SyncMetrics;
use crate::timers::TimerRegistry;
use pollsync_models::RemoteEvent;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the push-channel lifecycle and the session's timers.
///
/// `Disconnected -> Connecting -> Connected -> Disconnected -> (backoff) -> Connecting ...`
/// until `shutdown`, which is the only way to stay `Disconnected`.
pub struct ConnectionSupervisor {
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    timers: Arc<TimerRegistry>,
    task: Mutex<Option<JoinHandle<()>>>,
    backoff: Duration,
    metrics: Arc<SyncMetrics>,
    notifier: Arc<dyn Notifier>,
}

struct LoopContext {
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    backoff: Duration,
    metrics: Arc<SyncMetrics>,
    notifier: Arc<dyn Notifier>,
}

impl LoopContext {
    fn set(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl ConnectionSupervisor {
    pub fn new(backoff: Duration, metrics: Arc<SyncMetrics>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            timers: Arc::new(TimerRegistry::new()),
            task: Mutex::new(None),
            backoff,
            metrics,
            notifier,
        }
    }

    pub fn timers(&self) -> &Arc<TimerRegistry> {
        &self.timers
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawn the connection loop. Events reach `on_event` one at a time, in
    /// the order the transport yields them.
    ///
    /// Returns false if the loop is already running or the supervisor was shut down.
    pub fn start<T, F>(&self, transport: T, on_event: F) -> bool
    where
        T: PushTransport,
        F: FnMut(RemoteEvent) + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if task.is_some() {
            tracing::warn!("push channel supervisor already running");
            return false;
        }

        let ctx = LoopContext {
            state: self.state.clone(),
            cancel: self.cancel.clone(),
            backoff: self.backoff,
            metrics: self.metrics.clone(),
            notifier: self.notifier.clone(),
        };
        *task = Some(tokio::spawn(run(transport, on_event, ctx)));
        true
    }

    /// Terminal teardown: stop the loop, cancel the reconnect wait and every timer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.timers.cancel_all();
        self.state.send_replace(ConnectionState::Disconnected);
        tracing::info!("push channel supervisor shut down");
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.timers.cancel_all();
    }
}

async fn run<T, F>(transport: T, mut on_event: F, ctx: LoopContext)
where
    T: PushTransport,
    F: FnMut(RemoteEvent) + Send + 'static,
{
    let mut was_connected = false;
    let mut attempts: u64 = 0;

    loop {
        ctx.set(ConnectionState::Connecting);
        if attempts > 0 {
            ctx.metrics.reconnect_attempted();
        }
        attempts += 1;

        let connected = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return,
            result = transport.connect() => result,
        };

        let (reason, dropped) = match connected {
            Ok(mut conn) => {
                ctx.set(ConnectionState::Connected);
                tracing::info!(attempts, "push channel connected");
                if was_connected {
                    ctx.notifier
                        .notify(Notification::new(NotificationLevel::Info, "Live updates restored"));
                }
                was_connected = true;
                attempts = 0;

                let reason = loop {
                    tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => return,
                        next = conn.next_event() => match next {
                            Some(Ok(event)) => on_event(event),
                            Some(Err(e)) => break e.to_string(),
                            None => break "closed by server".to_string(),
                        },
                    }
                };
                (reason, true)
            }
            Err(e) => (e.to_string(), false),
        };

        ctx.set(ConnectionState::Disconnected);
        let lost = CoreError::ConnectionLost(reason);
        tracing::warn!(
            backoff_ms = ctx.backoff.as_millis() as u64,
            "{lost}; reconnecting after backoff"
        );
        if dropped {
            ctx.notifier.notify(Notification::new(
                NotificationLevel::Warning,
                "Connection offline, live updates paused",
            ));
        }

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return,
            _ = tokio::time::sleep(ctx.backoff) => {}
        }
    }
}
