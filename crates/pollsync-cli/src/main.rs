use anyhow::{Context, Result};
use clap::Parser;
use command::Command;
use pollsync_client::{HttpPollClient, WsPushTransport};
use pollsync_core::{PollSession, TracingNotifier};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod actions;
mod cli;
mod command;
mod config;
mod render;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pollsync=info"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = config::Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let token = args.token.or_else(|| config.auth.token.clone());

    let api = HttpPollClient::new(&config.server.api_url, token)?;
    let transport = WsPushTransport::new(&config.server.ws_url)?;
    let session = Arc::new(PollSession::new(api, Arc::new(TracingNotifier), config.engine()));
    tracing::info!(
        api = %config.server.api_url,
        ws = %config.server.ws_url,
        "starting session"
    );

    if let Err(e) = session.refresh_polls().await {
        tracing::warn!(error = %e, "initial poll list unavailable");
    }
    if let Some(poll_id) = args.focus {
        if let Err(e) = session.focus_poll(poll_id).await {
            tracing::warn!(poll_id, error = %e, "could not load poll");
        }
    }
    session.start(transport);

    let mut changes = session.changes();
    let mut connection = session.connection_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", render::render(&session.snapshot(), session.connection_state()));
    println!("{}", command::HELP);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render::render(&session.snapshot(), session.connection_state()));
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *connection.borrow_and_update();
                tracing::info!(?state, "push channel state changed");
                println!("{}", render::render(&session.snapshot(), state));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        actions::dispatch(&session, command);
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    session.shutdown();
    let metrics = session.metrics();
    tracing::info!(
        events = metrics.events_total,
        echoes_suppressed = metrics.echoes_suppressed,
        overrides = metrics.overrides,
        rollbacks = metrics.rollbacks,
        reconnect_attempts = metrics.reconnect_attempts,
        "session closed"
    );
    Ok(())
}
