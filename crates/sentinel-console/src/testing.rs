//! In-memory backend for unit tests

use crate::api::{ChatStream, ChunkSource, SoarApi};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

pub fn healthy(automation_rate: &str) -> SystemHealth {
    SystemHealth {
        status: HealthStatus::Healthy,
        uptime_seconds: 3600,
        traffic_processed: "1.2k".into(),
        automation_rate: automation_rate.into(),
    }
}

pub fn packet(id: i64, kind: &str) -> Packet {
    Packet {
        id,
        timestamp: Some("2024-05-01T10:00:00".into()),
        src_ip: format!("10.0.0.{}", id),
        country: Some("NL".into()),
        lat: Some(52.37),
        lon: Some(4.89),
        kind: kind.into(),
        confidence: 0.9,
        destination_port: Some(443),
        action: PacketAction::PendingReview,
        handled_by: None,
        resolved_at: None,
        target_username: None,
        burst_score: None,
        failed_attempts: None,
        traffic_volume: None,
        login_behavior: None,
    }
}

pub fn audit_entry(action: PacketAction, kind: &str, timestamp: Option<String>) -> AuditLogEntry {
    let handled_by = if action == PacketAction::AutoBlocked {
        "SYSTEM_AUTOMATION"
    } else {
        "admin_user"
    };
    AuditLogEntry {
        id: None,
        action,
        timestamp,
        src_ip: "10.9.9.9".into(),
        kind: kind.into(),
        handled_by: handled_by.into(),
        model_version: None,
        confidence: None,
    }
}

pub struct FakeApi {
    pub health: Mutex<ConsoleResult<SystemHealth>>,
    pub traffic: Mutex<Vec<Packet>>,
    pub pending: Mutex<Vec<Packet>>,
    pub audit: Mutex<Vec<AuditLogEntry>>,
    pub audit_error: Mutex<Option<ConsoleError>>,
    pub overview: Mutex<Option<OverviewMetrics>>,
    pub resolve_error: Mutex<Option<ConsoleError>>,
    /// Server keeps returning resolved incidents for a while
    pub lagging: AtomicBool,
    pub chat_chunks: Mutex<Vec<ConsoleResult<Vec<u8>>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            health: Mutex::new(Ok(healthy("0.0%"))),
            traffic: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            audit: Mutex::new(Vec::new()),
            audit_error: Mutex::new(None),
            overview: Mutex::new(None),
            resolve_error: Mutex::new(None),
            lagging: AtomicBool::new(false),
            chat_chunks: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }

    fn record(&self, name: &'static str) {
        *self.calls.lock().entry(name).or_insert(0) += 1;
    }
}

struct ScriptedChunks(VecDeque<ConsoleResult<Vec<u8>>>);

#[async_trait]
impl ChunkSource for ScriptedChunks {
    async fn next_chunk(&mut self) -> ConsoleResult<Option<Vec<u8>>> {
        self.0.pop_front().transpose()
    }
}

#[async_trait]
impl SoarApi for FakeApi {
    async fn system_health(&self) -> ConsoleResult<SystemHealth> {
        self.record("system_health");
        self.health.lock().clone()
    }

    async fn live_traffic(&self) -> ConsoleResult<Vec<Packet>> {
        self.record("live_traffic");
        Ok(self.traffic.lock().clone())
    }

    async fn pending_incidents(&self) -> ConsoleResult<Vec<Packet>> {
        self.record("pending_incidents");
        Ok(self.pending.lock().clone())
    }

    async fn resolve_incident(&self, id: i64, action: ResolveAction) -> ConsoleResult<ResolveResponse> {
        self.record("resolve_incident");
        if let Some(err) = self.resolve_error.lock().clone() {
            return Err(err);
        }
        if !self.lagging.load(Ordering::SeqCst) {
            self.pending.lock().retain(|p| p.id != id);
        }
        let outcome = match action {
            ResolveAction::Block => PacketAction::ManualBlock,
            ResolveAction::Ignore => PacketAction::FalsePositive,
        };
        self.audit.lock().insert(0, audit_entry(outcome, "Resolved", None));
        Ok(ResolveResponse {
            status: "success".into(),
            action_taken: Some(action.as_str().into()),
        })
    }

    async fn audit_log(&self) -> ConsoleResult<Vec<AuditLogEntry>> {
        self.record("audit_log");
        if let Some(err) = self.audit_error.lock().clone() {
            return Err(err);
        }
        Ok(self.audit.lock().clone())
    }

    async fn overview_metrics(&self) -> ConsoleResult<OverviewMetrics> {
        self.record("overview_metrics");
        self.overview.lock().clone().ok_or(ConsoleError::Status {
            status: 404,
            body: "Not Found".into(),
        })
    }

    async fn threat_map(&self) -> ConsoleResult<Vec<ThreatPoint>> {
        self.record("threat_map");
        Ok(Vec::new())
    }

    async fn current_config(&self) -> ConsoleResult<CurrentConfig> {
        self.record("current_config");
        Ok(CurrentConfig::default())
    }

    async fn update_config(&self, update: &PolicyUpdate) -> ConsoleResult<PolicyUpdateResponse> {
        self.record("update_config");
        let mut config = PolicyConfig::default();
        update.apply_to(&mut config);
        Ok(PolicyUpdateResponse { status: "updated".into(), config })
    }

    async fn admin_login(&self, _username: &str, _password: &str) -> ConsoleResult<LoginResponse> {
        self.record("admin_login");
        Err(ConsoleError::Unauthorized)
    }

    async fn admin_me(&self) -> ConsoleResult<AdminIdentity> {
        self.record("admin_me");
        Err(ConsoleError::Unauthorized)
    }

    async fn open_chat(&self, _request: &ChatRequest) -> ConsoleResult<ChatStream> {
        self.record("open_chat");
        let chunks: VecDeque<_> = self.chat_chunks.lock().drain(..).collect();
        Ok(ChatStream {
            session_id: Some(3),
            chunks: Box::new(ScriptedChunks(chunks)),
        })
    }
}
