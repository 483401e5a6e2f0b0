//! Simulated SOAR backend
//!
//! Stands in for the HTTP gateway when the console runs in simulation mode.
//! Every data request advances a seeded traffic generator by one step; the
//! generated packets go through the same auto-block / review split the real
//! backend applies, so pending incidents, audit entries and the derived
//! overview stay consistent with each other.
//!
//! The review queue is capped and, when queue relief is enabled in the
//! policy, promotes confident detections to automatic blocks once it backs
//! up. The audit log keeps a fixed window of the newest entries.

use crate::aggregator::{derive_overview, FallbackInputs};
use crate::api::{ChatStream, ChunkSource, Credentials, SoarApi};
use crate::compliance::AUTOMATION_HANDLER;
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

pub const SIMULATED_ADMIN_USERNAME: &str = "admin";
pub const SIMULATED_ADMIN_PASSWORD: &str = "admin123";
const TOKEN_TTL_SECONDS: u64 = 28_800;
const MODEL_VERSION: &str = "sim-rf-1.0";

const PACKETS_PER_STEP: usize = 3;
const TRAFFIC_WINDOW: usize = 50;
const PENDING_CAP: usize = 20;
const AUDIT_WINDOW: usize = 50;

const COUNTRIES: &[(&str, f64, f64)] = &[
    ("USA", 37.0902, -95.7129),
    ("China", 35.8617, 104.1954),
    ("Russia", 61.5240, 105.3188),
    ("Germany", 51.1657, 10.4515),
    ("Brazil", -14.2350, -51.9253),
    ("India", 20.5937, 78.9629),
    ("North Korea", 40.3399, 127.5101),
];

// (label, relative weight, destination port)
const LABELS: &[(&str, u32, u16)] = &[
    ("Normal Traffic", 60, 443),
    ("DDoS", 8, 80),
    ("DoS Hulk", 6, 80),
    ("PortScan", 8, 22),
    ("Brute Force -SSH", 5, 22),
    ("Web Attack - Sql Injection", 4, 8080),
    ("Web Attack - XSS", 4, 8080),
    ("Bot", 5, 8888),
];

const USERNAMES: &[&str] = &["admin", "root", "user1", "test_user", "service_account", "postgres", "manager"];

struct SimState {
    rng: StdRng,
    next_id: i64,
    traffic: VecDeque<Packet>,
    pending: Vec<Packet>,
    /// Newest first
    audit: VecDeque<AuditLogEntry>,
    config: PolicyConfig,
    scanned: u64,
    threats: u64,
    auto_blocked: u64,
    tokens: HashSet<String>,
    next_session: i64,
}

impl SimState {
    fn step(&mut self, now: DateTime<Utc>) {
        for _ in 0..PACKETS_PER_STEP {
            let packet = self.generate(now);
            self.ingest(packet, now);
        }
    }

    fn generate(&mut self, now: DateTime<Utc>) -> Packet {
        let total: u32 = LABELS.iter().map(|(_, w, _)| w).sum();
        let mut roll = self.rng.gen_range(0..total);
        let (kind, port) = LABELS
            .iter()
            .find(|(_, weight, _)| {
                if roll < *weight {
                    true
                } else {
                    roll -= weight;
                    false
                }
            })
            .map(|(kind, _, port)| (*kind, *port))
            .unwrap_or(("Normal Traffic", 443));

        let benign = !is_threat_label(kind);
        let (country, lat, lon) = *COUNTRIES.choose(&mut self.rng).unwrap_or(&COUNTRIES[0]);
        let mut confidence: f64 = if benign {
            self.rng.gen_range(0.90..0.999)
        } else {
            self.rng.gen_range(0.70..0.999)
        };
        if self.rng.gen_bool(self.config.model_noise_rate.clamp(0.0, 1.0)) {
            confidence = (confidence - self.rng.gen_range(0.10..0.25)).max(0.50);
        }

        let credential_attack = ["Brute", "Sql", "XSS", "Bot"].iter().any(|n| kind.contains(n));
        let (failed_attempts, login_behavior, target_username) = if benign {
            (self.rng.gen_range(0..=3), "Normal", None)
        } else if credential_attack {
            let user = USERNAMES.choose(&mut self.rng).map(|u| u.to_string());
            (self.rng.gen_range(5..=50), "Detected", user)
        } else {
            (self.rng.gen_range(1..=6), "Suspicious", None)
        };
        let burst_score: f64 = if benign {
            self.rng.gen_range(0.0..1.4)
        } else {
            self.rng.gen_range(1.5..5.0)
        };

        self.next_id += 1;
        Packet {
            id: self.next_id,
            timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            src_ip: format!("192.168.1.{}", self.rng.gen_range(10..=200)),
            country: Some(country.to_string()),
            lat: Some(lat),
            lon: Some(lon),
            kind: kind.to_string(),
            confidence,
            destination_port: Some(port),
            action: PacketAction::Monitor,
            handled_by: None,
            resolved_at: None,
            target_username,
            burst_score: Some((burst_score * 100.0).round() / 100.0),
            failed_attempts: Some(failed_attempts),
            traffic_volume: Some(if benign { "Normal" } else { "High" }.to_string()),
            login_behavior: Some(login_behavior.to_string()),
        }
    }

    fn ingest(&mut self, mut packet: Packet, now: DateTime<Utc>) {
        self.scanned += 1;
        if packet.is_threat() {
            self.threats += 1;
            let queue_open = self.pending.len() < PENDING_CAP;
            if packet.confidence >= self.config.auto_block_threshold || (queue_open && self.relieve_queue(&packet)) {
                packet.action = PacketAction::AutoBlocked;
                self.auto_blocked += 1;
                self.record(&packet, PacketAction::AutoBlocked, AUTOMATION_HANDLER, now);
            } else {
                // a full queue drops the review request; the traffic row stays pending
                packet.action = PacketAction::PendingReview;
                if queue_open {
                    self.pending.push(packet.clone());
                }
            }
        }
        self.traffic.push_front(packet);
        self.traffic.truncate(TRAFFIC_WINDOW);
    }

    /// Whether a packet headed for review is promoted to an automatic block
    /// because the queue has backed up
    fn relieve_queue(&self, packet: &Packet) -> bool {
        let config = &self.config;
        if !config.auto_resolve_pending_enabled {
            return false;
        }
        if self.pending.len() + 1 < config.pending_auto_resolve_queue_trigger as usize {
            return false;
        }
        let promote_at = (config.auto_block_threshold - config.pending_auto_resolve_delta).max(config.min_threshold);
        packet.confidence >= promote_at
    }

    fn record(&mut self, packet: &Packet, action: PacketAction, handler: &str, now: DateTime<Utc>) {
        self.audit.push_front(AuditLogEntry {
            id: Some(packet.id),
            action,
            timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            src_ip: packet.src_ip.clone(),
            kind: packet.kind.clone(),
            handled_by: handler.to_string(),
            model_version: Some(MODEL_VERSION.to_string()),
            confidence: Some(packet.confidence),
        });
        self.audit.truncate(AUDIT_WINDOW);
    }

    fn health(&self, started: DateTime<Utc>, now: DateTime<Utc>) -> SystemHealth {
        let automation = if self.threats == 0 {
            0.0
        } else {
            self.auto_blocked as f64 / self.threats as f64 * 100.0
        };
        SystemHealth {
            status: HealthStatus::Healthy,
            uptime_seconds: (now - started).num_seconds().max(0) as u64,
            traffic_processed: format!("{:.1}k", self.scanned as f64 / 1000.0),
            automation_rate: format!("{:.1}%", automation),
        }
    }
}

fn simulated_policy() -> PolicyConfig {
    PolicyConfig {
        auto_resolve_pending_enabled: true,
        pending_auto_resolve_queue_trigger: 18,
        pending_auto_resolve_delta: 0.03,
        ..PolicyConfig::default()
    }
}

/// In-process backend producing plausible, seed-reproducible data
pub struct SimulatedApi {
    credentials: Arc<Credentials>,
    started: DateTime<Utc>,
    state: Mutex<SimState>,
}

impl SimulatedApi {
    pub fn new(credentials: Arc<Credentials>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            credentials,
            started: Utc::now(),
            state: Mutex::new(SimState {
                rng,
                next_id: 0,
                traffic: VecDeque::with_capacity(TRAFFIC_WINDOW),
                pending: Vec::new(),
                audit: VecDeque::with_capacity(AUDIT_WINDOW),
                config: simulated_policy(),
                scanned: 0,
                threats: 0,
                auto_blocked: 0,
                tokens: HashSet::new(),
                next_session: 0,
            }),
        }
    }

    fn advance(&self) -> parking_lot::MutexGuard<'_, SimState> {
        let mut state = self.state.lock();
        state.step(Utc::now());
        state
    }

    fn require_admin(&self) -> ConsoleResult<()> {
        let token = self.credentials.bearer().ok_or(ConsoleError::Unauthorized)?;
        if self.state.lock().tokens.contains(&token) {
            Ok(())
        } else {
            Err(ConsoleError::Unauthorized)
        }
    }
}

struct WordChunks(VecDeque<Vec<u8>>);

#[async_trait]
impl ChunkSource for WordChunks {
    async fn next_chunk(&mut self) -> ConsoleResult<Option<Vec<u8>>> {
        Ok(self.0.pop_front())
    }
}

#[async_trait]
impl SoarApi for SimulatedApi {
    async fn system_health(&self) -> ConsoleResult<SystemHealth> {
        let now = Utc::now();
        Ok(self.advance().health(self.started, now))
    }

    async fn live_traffic(&self) -> ConsoleResult<Vec<Packet>> {
        Ok(self.advance().traffic.iter().cloned().collect())
    }

    async fn pending_incidents(&self) -> ConsoleResult<Vec<Packet>> {
        Ok(self.advance().pending.clone())
    }

    async fn resolve_incident(&self, id: i64, action: ResolveAction) -> ConsoleResult<ResolveResponse> {
        let now = Utc::now();
        let mut state = self.state.lock();
        let idx = state
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ConsoleError::Status {
                status: 404,
                body: format!("incident {} not found", id),
            })?;
        let mut packet = state.pending.remove(idx);
        let outcome = match action {
            ResolveAction::Block => PacketAction::ManualBlock,
            ResolveAction::Ignore => PacketAction::FalsePositive,
        };
        packet.action = outcome.clone();
        packet.handled_by = Some(SIMULATED_ADMIN_USERNAME.to_string());
        packet.resolved_at = Some(now.to_rfc3339_opts(SecondsFormat::Micros, true));
        if let Some(row) = state.traffic.iter_mut().find(|p| p.id == id) {
            *row = packet.clone();
        }
        let action_taken = outcome.as_str().to_string();
        state.record(&packet, outcome, SIMULATED_ADMIN_USERNAME, now);
        Ok(ResolveResponse {
            status: "success".into(),
            action_taken: Some(action_taken),
        })
    }

    async fn audit_log(&self) -> ConsoleResult<Vec<AuditLogEntry>> {
        Ok(self.advance().audit.iter().cloned().collect())
    }

    async fn overview_metrics(&self) -> ConsoleResult<OverviewMetrics> {
        let now = Utc::now();
        let state = self.advance();
        let inputs = FallbackInputs {
            health: state.health(self.started, now),
            traffic: state.traffic.iter().cloned().collect(),
            pending: state.pending.clone(),
            audit: state.audit.iter().cloned().collect(),
        };
        Ok(derive_overview(&inputs, now))
    }

    async fn threat_map(&self) -> ConsoleResult<Vec<ThreatPoint>> {
        let state = self.advance();
        Ok(state
            .traffic
            .iter()
            .filter(|p| p.is_threat())
            .map(|p| ThreatPoint {
                id: p.id,
                lat: p.lat,
                lon: p.lon,
                kind: p.kind.clone(),
                src_ip: p.src_ip.clone(),
                country: p.country.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn current_config(&self) -> ConsoleResult<CurrentConfig> {
        Ok(CurrentConfig {
            config: self.state.lock().config.clone(),
            model_version: Some(MODEL_VERSION.to_string()),
        })
    }

    async fn update_config(&self, update: &PolicyUpdate) -> ConsoleResult<PolicyUpdateResponse> {
        self.require_admin()?;
        update.validate().map_err(ConsoleError::Config)?;
        let mut state = self.state.lock();
        update.apply_to(&mut state.config);
        Ok(PolicyUpdateResponse {
            status: "updated".into(),
            config: state.config.clone(),
        })
    }

    async fn admin_login(&self, username: &str, password: &str) -> ConsoleResult<LoginResponse> {
        if username != SIMULATED_ADMIN_USERNAME || password != SIMULATED_ADMIN_PASSWORD {
            return Err(ConsoleError::Unauthorized);
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.state.lock().tokens.insert(token.clone());
        Ok(LoginResponse {
            token,
            expires_in: TOKEN_TTL_SECONDS,
            username: SIMULATED_ADMIN_USERNAME.to_string(),
        })
    }

    async fn admin_me(&self) -> ConsoleResult<AdminIdentity> {
        self.require_admin()?;
        Ok(AdminIdentity {
            authenticated: true,
            username: SIMULATED_ADMIN_USERNAME.to_string(),
        })
    }

    async fn open_chat(&self, request: &ChatRequest) -> ConsoleResult<ChatStream> {
        let mut state = self.state.lock();
        let session_id = match request.session_id {
            Some(id) => id,
            None => {
                state.next_session += 1;
                state.next_session
            }
        };
        let reply = format!(
            "Simulated analyst: {} packets scanned, {} threats detected, {} auto-blocked, {} awaiting review.",
            state.scanned,
            state.threats,
            state.auto_blocked,
            state.pending.len()
        );
        let chunks = reply
            .split_inclusive(' ')
            .map(|word| word.as_bytes().to_vec())
            .collect();
        Ok(ChatStream {
            session_id: Some(session_id),
            chunks: Box::new(WordChunks(chunks)),
        })
    }
}
