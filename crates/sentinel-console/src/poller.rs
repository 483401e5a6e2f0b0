//! Polling loop
//!
//! A [`Poller`] owns one piece of remote state, refreshes it on a fixed
//! period and publishes every change through a `watch` channel.
//!
//! Each tick spawns its own fetch, so a slow response may overlap the next
//! tick. Every fetch carries a sequence number and a response is applied only
//! when it is newer than the last applied one; a reordered pair can never
//! regress the snapshot.
//!
//! Stopping a [`PollHandle`] only silences fetches spawned by that handle's
//! schedule. Other handles and explicit [`Poller::refresh`] calls keep
//! applying their results.

use crate::error::{ConsoleError, ConsoleResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Remote state fetched by a poller
#[async_trait]
pub trait PollSource: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> ConsoleResult<Self::Output>;
}

/// Snapshot published to subscribers
#[derive(Debug, Clone)]
pub struct PollState<T> {
    pub data: T,
    /// True until the first fetch completes
    pub loading: bool,
    /// Error of the most recent fetch, cleared by the next success
    pub last_error: Option<ConsoleError>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Sequence number of the fetch that produced `data`
    pub sequence: u64,
}

impl<T> PollState<T> {
    fn initial(data: T) -> Self {
        Self {
            data,
            loading: true,
            last_error: None,
            updated_at: None,
            sequence: 0,
        }
    }
}

struct Inner<S: PollSource> {
    source: S,
    state: watch::Sender<PollState<S::Output>>,
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl<S: PollSource> Inner<S> {
    /// Fetch and apply; a result is dropped if `cancelled` was set meanwhile
    async fn refresh(&self, cancelled: Option<&AtomicBool>) -> ConsoleResult<()> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(poller = self.source.name(), seq, "fetching");
        let result = self.source.fetch().await;
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        if cancelled.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            tracing::debug!(poller = self.source.name(), seq, "schedule stopped, dropping result");
        } else {
            self.apply(seq, result);
        }
        outcome
    }

    fn apply(&self, seq: u64, result: ConsoleResult<S::Output>) {
        let mut applied = self.applied.lock();
        if seq <= *applied {
            tracing::debug!(poller = self.source.name(), seq, latest = *applied, "discarding stale response");
            return;
        }
        *applied = seq;

        match result {
            Ok(data) => self.state.send_modify(|state| {
                state.data = data;
                state.loading = false;
                state.last_error = None;
                state.updated_at = Some(Utc::now());
                state.sequence = seq;
            }),
            Err(err) => {
                tracing::warn!(poller = self.source.name(), "fetch failed, keeping last snapshot: {}", err);
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.last_error = Some(err);
                });
            }
        }
    }
}

/// Polling hook over a [`PollSource`]
pub struct Poller<S: PollSource> {
    inner: Arc<Inner<S>>,
}

impl<S: PollSource> Clone for Poller<S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S: PollSource> Poller<S> {
    pub fn new(source: S, initial: S::Output) -> Self {
        let (state, _) = watch::channel(PollState::initial(initial));
        Self {
            inner: Arc::new(Inner {
                source,
                state,
                issued: AtomicU64::new(0),
                applied: Mutex::new(0),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PollState<S::Output> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<S::Output>> {
        self.inner.state.subscribe()
    }

    /// Fetch once and apply the result
    pub async fn refresh(&self) -> ConsoleResult<()> {
        self.inner.refresh(None).await
    }

    /// Apply a local change ahead of the server.
    ///
    /// Fetches issued before the change are invalidated so they cannot
    /// overwrite it; the next fetch reconciles with the server.
    pub fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut S::Output),
    {
        let mut applied = self.inner.applied.lock();
        *applied = (*applied).max(self.inner.issued.load(Ordering::SeqCst));
        self.inner.state.send_modify(|state| f(&mut state.data));
    }

    /// Fetch immediately, then every `period` until the handle is dropped
    pub fn start(&self, period: Duration) -> PollHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let inner = self.inner.clone();
        let flag = cancelled.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let inner = inner.clone();
                let flag = flag.clone();
                tokio::spawn(async move {
                    let _ = inner.refresh(Some(&flag)).await;
                });
            }
        });

        PollHandle {
            task: Some(task),
            cancelled,
        }
    }
}

/// Running poll schedule; dropping it cancels the timer
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
    /// Set once stopped; fetches from this schedule still in flight see it
    cancelled: Arc<AtomicBool>,
}

impl PollHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            self.cancelled.store(true, Ordering::SeqCst);
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
