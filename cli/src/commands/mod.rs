//! CLI Commands

pub mod audit;
pub mod auth;
pub mod chat;
pub mod config;
pub mod health;
pub mod incidents;
pub mod overview;
pub mod policy;
pub mod threats;
pub mod traffic;

use crate::output::{self, OutputFormat};
use colored::Colorize;
use sentinel_console::{ConsoleConfig, Credentials, PollSource, PollState, Poller, SessionStore, SoarApi};
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs to talk to the backend
pub struct Context {
    pub config: ConsoleConfig,
    pub api: Arc<dyn SoarApi>,
    pub session: SessionStore,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: ConsoleConfig, format: OutputFormat) -> anyhow::Result<Self> {
        let credentials = Arc::new(Credentials::new());
        let session = SessionStore::new(config.token_storage(), credentials.clone());
        session.initialize_session();
        let api = config.connect(credentials)?;
        tracing::debug!(mode = %config.mode, api_url = %config.api_url, "console context ready");
        Ok(Self {
            config,
            api,
            session,
            format,
        })
    }
}

/// Poll and render every new snapshot until Ctrl-C
pub async fn watch<S, F>(poller: &Poller<S>, period: Duration, mut render: F) -> anyhow::Result<()>
where
    S: PollSource,
    F: FnMut(&PollState<S::Output>),
{
    let mut rx = poller.subscribe();
    let handle = poller.start(period);
    eprintln!("{}", format!("polling every {:?}, Ctrl-C to stop", period).dimmed());

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if state.loading {
                    continue;
                }
                println!("{}", chrono::Local::now().format("── %H:%M:%S ──").to_string().dimmed());
                render(&state);
                if let Some(err) = &state.last_error {
                    output::warn(&format!("last refresh failed, showing previous data: {}", err));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop();
    Ok(())
}
