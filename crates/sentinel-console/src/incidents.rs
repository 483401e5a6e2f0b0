//! Admin desk: pending incident queue, recent actions and resolution
//!
//! The desk polls `/incidents/pending` and `/logs/audit` together. Resolving
//! an incident removes it locally before the server confirms, announces it on
//! the [`ResolutionBus`] and then reconciles with a fresh fetch. Resolved ids
//! stay hidden until the server stops returning them.

use crate::api::SoarApi;
use crate::bus::ResolutionBus;
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::{AuditLogEntry, Packet, ResolveAction, ResolveResponse};
use crate::poller::{PollHandle, PollSource, PollState, Poller};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Number of audit entries shown as recent actions
pub const RECENT_ACTIONS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminSnapshot {
    pub pending: Vec<Packet>,
    /// Newest first
    pub recent_actions: Vec<AuditLogEntry>,
    pub open_tickets: usize,
}

impl AdminSnapshot {
    fn remove(&mut self, id: i64) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.open_tickets = self.pending.len();
        self.pending.len() != before
    }
}

pub struct AdminSource {
    api: Arc<dyn SoarApi>,
    resolved: Mutex<HashSet<i64>>,
}

impl AdminSource {
    fn remember(&self, id: i64) {
        self.resolved.lock().insert(id);
    }

    /// Hide remembered ids; forget the ones the server no longer returns
    fn reconcile(&self, mut pending: Vec<Packet>) -> Vec<Packet> {
        let mut resolved = self.resolved.lock();
        if resolved.is_empty() {
            return pending;
        }
        let returned: HashSet<i64> = pending.iter().map(|p| p.id).collect();
        resolved.retain(|id| returned.contains(id));
        pending.retain(|p| !resolved.contains(&p.id));
        pending
    }
}

#[async_trait]
impl PollSource for AdminSource {
    type Output = AdminSnapshot;

    fn name(&self) -> &'static str {
        "admin_desk"
    }

    async fn fetch(&self) -> ConsoleResult<AdminSnapshot> {
        let (pending, audit) = tokio::try_join!(self.api.pending_incidents(), self.api.audit_log())?;
        let pending = self.reconcile(pending);
        Ok(AdminSnapshot {
            open_tickets: pending.len(),
            pending,
            recent_actions: audit.into_iter().take(RECENT_ACTIONS).collect(),
        })
    }
}

#[derive(Clone)]
pub struct AdminDesk {
    api: Arc<dyn SoarApi>,
    poller: Poller<AdminSource>,
    bus: ResolutionBus,
}

impl AdminDesk {
    pub fn new(api: Arc<dyn SoarApi>, bus: ResolutionBus) -> Self {
        let source = AdminSource {
            api: api.clone(),
            resolved: Mutex::new(HashSet::new()),
        };
        Self {
            api,
            poller: Poller::new(source, AdminSnapshot::default()),
            bus,
        }
    }

    pub fn poller(&self) -> &Poller<AdminSource> {
        &self.poller
    }

    pub fn snapshot(&self) -> PollState<AdminSnapshot> {
        self.poller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<AdminSnapshot>> {
        self.poller.subscribe()
    }

    pub async fn refresh(&self) -> ConsoleResult<()> {
        self.poller.refresh().await
    }

    pub fn start(&self, period: Duration) -> PollHandle {
        self.poller.start(period)
    }

    /// Resolve a pending incident.
    ///
    /// On failure the local queue is left as it was and the error is
    /// returned; there is no retry.
    pub async fn resolve(&self, id: i64, action: ResolveAction) -> ConsoleResult<ResolveResponse> {
        let response = match self.api.resolve_incident(id, action).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(incident = id, %action, "failed to resolve incident: {}", err);
                return Err(err);
            }
        };
        tracing::info!(incident = id, %action, "incident resolved");

        self.prune(id);
        self.bus.publish(id);
        // refresh failures are kept in the poll state
        let _ = self.poller.refresh().await;
        Ok(response)
    }

    /// Refresh the queue, then resolve `id` only if the server lists it as
    /// pending
    pub async fn resolve_pending(&self, id: i64, action: ResolveAction) -> ConsoleResult<ResolveResponse> {
        self.refresh().await?;
        if !self.snapshot().data.pending.iter().any(|p| p.id == id) {
            return Err(ConsoleError::Status {
                status: 404,
                body: format!("incident {} is not in the pending queue", id),
            });
        }
        self.resolve(id, action).await
    }

    /// React to a resolution announced elsewhere
    pub async fn handle_resolved(&self, id: i64) {
        if !self.prune(id) {
            tracing::debug!(incident = id, "resolved incident not in local queue");
        }
        let _ = self.poller.refresh().await;
    }

    /// Listen on the bus until the returned task is aborted
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let desk = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => desk.handle_resolved(event.id).await,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "resolution listener lagged, refetching");
                        let _ = desk.poller.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn prune(&self, id: i64) -> bool {
        self.poller.source().remember(id);
        let mut removed = false;
        self.poller.mutate(|snapshot| removed = snapshot.remove(id));
        removed
    }
}
