//! Wire models for the Sentinel SOAR API
//!
//! Records are deserialized leniently: the backend emits database rows where
//! most columns are nullable, so `null` is folded into the field default
//! instead of failing the whole poll.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and the naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` form the
/// backend emits for UTC columns.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Convert a confidence fraction into a whole display percentage.
///
/// Every percentage shown for a confidence value goes through here.
pub fn confidence_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u32
}

// =============================================================================
// System health
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    #[default]
    Degraded,
}

/// `/system/health` snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub uptime_seconds: u64,
    /// Human formatted volume, e.g. `"1.2k"`
    #[serde(default, deserialize_with = "null_default")]
    pub traffic_processed: String,
    /// Percentage string, e.g. `"92.0%"`
    #[serde(default, deserialize_with = "null_default")]
    pub automation_rate: String,
}

// =============================================================================
// Packets and incidents
// =============================================================================

/// Action taken on a packet.
///
/// Labels this client does not model are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PacketAction {
    Monitor,
    AutoBlocked,
    PendingReview,
    ManualBlock,
    FalsePositive,
    Other(String),
}

impl Default for PacketAction {
    fn default() -> Self {
        PacketAction::Other(String::new())
    }
}

impl PacketAction {
    /// Blocked automatically or by an analyst
    pub fn is_block(&self) -> bool {
        matches!(self, PacketAction::AutoBlocked | PacketAction::ManualBlock)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PacketAction::Monitor => "MONITOR",
            PacketAction::AutoBlocked => "AUTO_BLOCKED",
            PacketAction::PendingReview => "PENDING_REVIEW",
            PacketAction::ManualBlock => "MANUAL_BLOCK",
            PacketAction::FalsePositive => "FALSE_POSITIVE",
            PacketAction::Other(raw) => raw,
        }
    }
}

impl From<String> for PacketAction {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "MONITOR" => PacketAction::Monitor,
            "AUTO_BLOCKED" => PacketAction::AutoBlocked,
            "PENDING_REVIEW" => PacketAction::PendingReview,
            "MANUAL_BLOCK" => PacketAction::ManualBlock,
            "FALSE_POSITIVE" => PacketAction::FalsePositive,
            _ => PacketAction::Other(raw),
        }
    }
}

impl From<PacketAction> for String {
    fn from(action: PacketAction) -> Self {
        match action {
            PacketAction::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PacketAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Review-queue rows carry a status column instead of an action.
fn pending_action() -> PacketAction {
    PacketAction::PendingReview
}

/// A traffic or incident record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub src_ip: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Free-form classification label
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub kind: String,
    /// Fraction in `[0, 1]`
    #[serde(default, deserialize_with = "null_default")]
    pub confidence: f64,
    #[serde(default)]
    pub destination_port: Option<u16>,
    #[serde(default = "pending_action")]
    pub action: PacketAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_behavior: Option<String>,
}

impl Packet {
    pub fn confidence_percent(&self) -> u32 {
        confidence_percent(self.confidence)
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    /// Anything other than benign traffic
    pub fn is_threat(&self) -> bool {
        is_threat_label(&self.kind)
    }
}

/// Whether a classification label names a threat
pub fn is_threat_label(kind: &str) -> bool {
    !kind.trim().eq_ignore_ascii_case("normal traffic")
}

/// Analyst decision for a pending incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolveAction {
    Block,
    Ignore,
}

impl ResolveAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolveAction::Block => "BLOCK",
            ResolveAction::Ignore => "IGNORE",
        }
    }
}

impl std::fmt::Display for ResolveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResolveAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(ResolveAction::Block),
            "ignore" => Ok(ResolveAction::Ignore),
            other => Err(format!("unknown resolve action: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveRequest {
    pub action: ResolveAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub action_taken: Option<String>,
}

// =============================================================================
// Audit log
// =============================================================================

/// Historical record of a resolved action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub action: PacketAction,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub src_ip: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_default")]
    pub handled_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AuditLogEntry {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    pub fn is_threat(&self) -> bool {
        is_threat_label(&self.kind)
    }

    pub fn confidence_percent(&self) -> Option<u32> {
        self.confidence.map(confidence_percent)
    }
}

// =============================================================================
// Overview metrics
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl SeverityDistribution {
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low
    }
}

/// One 4-hour decision-velocity bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityBucket {
    pub automated: u64,
    pub human: u64,
}

/// Aggregate dashboard snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewMetrics {
    pub status: HealthStatus,
    pub traffic_processed: String,
    pub traffic_change_percent: f64,
    pub traffic_bars_24h: Vec<f64>,
    pub system_health_score: f64,
    pub automation_rate: String,
    pub automation_rate_value: f64,
    pub active_threats: u64,
    /// Counted over the whole audit log returned by the server
    pub blocked_ips_24h: u64,
    pub avg_blocked_per_hour: f64,
    pub mean_time_to_respond_seconds: f64,
    pub severity_distribution: SeverityDistribution,
    /// Six 4-hour buckets, oldest first
    pub decision_velocity: Vec<VelocityBucket>,
    pub escalated_count: u64,
    pub analyst_hours_saved: f64,
    pub false_positive_rate: f64,
    pub auto_block_threshold_percent: f64,
    pub review_threshold_percent: f64,
    pub db_latency_ms: f64,
    pub api_latency_ms: f64,
}

impl Default for OverviewMetrics {
    fn default() -> Self {
        Self {
            status: HealthStatus::Degraded,
            traffic_processed: "0.0k".to_string(),
            traffic_change_percent: 0.0,
            traffic_bars_24h: vec![0.0; 12],
            system_health_score: 0.0,
            automation_rate: "0.0%".to_string(),
            automation_rate_value: 0.0,
            active_threats: 0,
            blocked_ips_24h: 0,
            avg_blocked_per_hour: 0.0,
            mean_time_to_respond_seconds: 0.0,
            severity_distribution: SeverityDistribution::default(),
            decision_velocity: vec![VelocityBucket::default(); 6],
            escalated_count: 0,
            analyst_hours_saved: 0.0,
            false_positive_rate: 0.0,
            auto_block_threshold_percent: 95.0,
            review_threshold_percent: 85.0,
            db_latency_ms: 0.0,
            api_latency_ms: 0.0,
        }
    }
}

// =============================================================================
// Threat map
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPoint {
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_default")]
    pub src_ip: String,
    #[serde(default, deserialize_with = "null_default")]
    pub country: String,
}

// =============================================================================
// Policy configuration
// =============================================================================

/// Detection policy thresholds and feature flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub auto_block_threshold: f64,
    pub dynamic_threshold_enabled: bool,
    pub model_noise_rate: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub auto_resolve_pending_enabled: bool,
    pub pending_auto_resolve_queue_trigger: u32,
    pub pending_auto_resolve_delta: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_block_threshold: 0.95,
            dynamic_threshold_enabled: false,
            model_noise_rate: 0.0,
            min_threshold: 0.85,
            max_threshold: 0.99,
            auto_resolve_pending_enabled: false,
            pending_auto_resolve_queue_trigger: 0,
            pending_auto_resolve_delta: 0.0,
        }
    }
}

/// `/config/current` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConfig {
    #[serde(default)]
    pub config: PolicyConfig,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Partial policy update; unset fields are left untouched server-side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_threshold_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_noise_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_resolve_pending_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_auto_resolve_queue_trigger: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_auto_resolve_delta: Option<f64>,
}

impl PolicyUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PolicyUpdate::default()
    }

    /// Reject values the backend would refuse
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("threshold must be within [0, 1], got {}", t));
            }
        }
        if let Some(n) = self.model_noise_rate {
            if !(0.0..=0.5).contains(&n) {
                return Err(format!("model_noise_rate must be within [0, 0.5], got {}", n));
            }
        }
        if let (Some(min), Some(max)) = (self.min_threshold, self.max_threshold) {
            if min > max {
                return Err("min_threshold cannot exceed max_threshold".to_string());
            }
        }
        Ok(())
    }

    /// Apply onto a local config copy
    pub fn apply_to(&self, config: &mut PolicyConfig) {
        if let Some(v) = self.threshold {
            config.auto_block_threshold = v;
        }
        if let Some(v) = self.dynamic_threshold_enabled {
            config.dynamic_threshold_enabled = v;
        }
        if let Some(v) = self.model_noise_rate {
            config.model_noise_rate = v;
        }
        if let Some(v) = self.min_threshold {
            config.min_threshold = v;
        }
        if let Some(v) = self.max_threshold {
            config.max_threshold = v;
        }
        if let Some(v) = self.auto_resolve_pending_enabled {
            config.auto_resolve_pending_enabled = v;
        }
        if let Some(v) = self.pending_auto_resolve_queue_trigger {
            config.pending_auto_resolve_queue_trigger = v;
        }
        if let Some(v) = self.pending_auto_resolve_delta {
            config.pending_auto_resolve_delta = v;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyUpdateResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub config: PolicyConfig,
}

// =============================================================================
// Admin auth
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminIdentity {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub username: String,
}

// =============================================================================
// Assistant chat
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_tolerates_nulls_and_unknown_action() {
        let raw = r#"{
            "id": 7, "timestamp": "2024-05-01T10:00:00.123456", "src_ip": null,
            "country": "DE", "lat": null, "lon": 13.4, "type": "Port Scan",
            "confidence": 0.875, "destination_port": 22, "action": "QUARANTINED"
        }"#;
        let packet: Packet = serde_json::from_str(raw).unwrap();
        assert_eq!(packet.src_ip, "");
        assert_eq!(packet.action, PacketAction::Other("QUARANTINED".into()));
        assert_eq!(serde_json::to_value(&packet.action).unwrap(), "QUARANTINED");
        assert_eq!(packet.confidence_percent(), 88);
        assert!(packet.parsed_timestamp().is_some());
    }

    #[test]
    fn test_known_action_labels_round_trip() {
        let action: PacketAction = serde_json::from_str(r#""MANUAL_BLOCK""#).unwrap();
        assert_eq!(action, PacketAction::ManualBlock);
        assert!(action.is_block());
        assert_eq!(serde_json::to_string(&action).unwrap(), r#""MANUAL_BLOCK""#);

        let entry: AuditLogEntry = serde_json::from_str(r#"{"action": null, "src_ip": "1.2.3.4"}"#).unwrap();
        assert_eq!(entry.action.as_str(), "");
    }

    #[test]
    fn test_review_queue_row_defaults_to_pending() {
        let raw = r#"{"id": 42, "src_ip": "10.0.0.9", "type": "SQL Injection", "confidence": 0.9, "status": "PENDING"}"#;
        let packet: Packet = serde_json::from_str(raw).unwrap();
        assert_eq!(packet.action, PacketAction::PendingReview);
        assert!(packet.is_threat());
    }

    #[test]
    fn test_normal_traffic_is_not_threat() {
        assert!(!is_threat_label("Normal Traffic"));
        assert!(!is_threat_label("normal traffic "));
        assert!(is_threat_label("Normal"));
    }

    #[test]
    fn test_confidence_percent_is_clamped() {
        assert_eq!(confidence_percent(0.956), 96);
        assert_eq!(confidence_percent(1.7), 100);
        assert_eq!(confidence_percent(-0.2), 0);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let rfc = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let naive = parse_timestamp("2024-05-01T10:00:00").unwrap();
        assert_eq!(rfc, naive);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_policy_update_validation() {
        let bad = PolicyUpdate { threshold: Some(1.2), ..Default::default() };
        assert!(bad.validate().is_err());

        let inverted = PolicyUpdate { min_threshold: Some(0.9), max_threshold: Some(0.8), ..Default::default() };
        assert!(inverted.validate().is_err());

        let ok = PolicyUpdate { model_noise_rate: Some(0.1), ..Default::default() };
        assert!(ok.validate().is_ok());
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({"model_noise_rate": 0.1}));
    }

    #[test]
    fn test_policy_update_applies_only_set_fields() {
        let mut config = PolicyConfig::default();
        let update = PolicyUpdate {
            threshold: Some(0.9),
            pending_auto_resolve_queue_trigger: Some(12),
            ..Default::default()
        };
        update.apply_to(&mut config);
        assert_eq!(config.auto_block_threshold, 0.9);
        assert_eq!(config.pending_auto_resolve_queue_trigger, 12);
        assert_eq!(config.min_threshold, PolicyConfig::default().min_threshold);
    }

    #[test]
    fn test_overview_metrics_accepts_partial_payload() {
        let metrics: OverviewMetrics = serde_json::from_str(r#"{"status": "HEALTHY", "active_threats": 4, "model_version": "v3"}"#).unwrap();
        assert_eq!(metrics.status, HealthStatus::Healthy);
        assert_eq!(metrics.active_threats, 4);
        assert_eq!(metrics.decision_velocity.len(), 6);
    }
}
