//! Derived overview metrics
//!
//! When `/metrics/overview` is unavailable the dashboard summary is
//! recomputed from health, live traffic, pending incidents and the audit
//! log. The computation is deterministic for a given input set and `now`.

use crate::api::SoarApi;
use crate::error::ConsoleResult;
use crate::models::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const VELOCITY_BUCKETS: usize = 6;
pub const VELOCITY_BUCKET_HOURS: f64 = 4.0;
pub const VELOCITY_WINDOW_HOURS: f64 = VELOCITY_BUCKETS as f64 * VELOCITY_BUCKET_HOURS;
/// Analyst handling time assumed for each blocked incident
pub const MINUTES_SAVED_PER_BLOCK: f64 = 15.0;

const HEALTHY_SCORE: f64 = 98.0;
const DEGRADED_SCORE: f64 = 75.0;
const AUTO_BLOCK_THRESHOLD_PERCENT: f64 = 95.0;
const REVIEW_THRESHOLD_PERCENT: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

// First match wins.
const SEVERITY_RULES: &[(Severity, &[&str])] = &[
    (Severity::Critical, &["ddos", "dos", "heartbleed"]),
    (Severity::High, &["brute", "sql", "xss", "bot"]),
    (Severity::Medium, &["port", "scan"]),
];

/// Severity of a classification label, `None` for normal traffic
pub fn classify_severity(kind: &str) -> Option<Severity> {
    if !is_threat_label(kind) {
        return None;
    }
    let kind = kind.to_lowercase();
    let severity = SEVERITY_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| kind.contains(n)))
        .map(|(severity, _)| *severity)
        .unwrap_or(Severity::Low);
    Some(severity)
}

/// `"92.0%"` → `92.0`; anything unparseable → `0`
pub fn parse_percent(raw: &str) -> f64 {
    raw.trim()
        .replacen('%', "", 1)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Histogram over threat labels, plus the number of threats counted
pub fn severity_histogram<'a, I>(kinds: I) -> (SeverityDistribution, u64)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut dist = SeverityDistribution::default();
    let mut threats = 0;
    for severity in kinds.into_iter().filter_map(classify_severity) {
        threats += 1;
        match severity {
            Severity::Critical => dist.critical += 1,
            Severity::High => dist.high += 1,
            Severity::Medium => dist.medium += 1,
            Severity::Low => dist.low += 1,
        }
    }
    (dist, threats)
}

/// Six 4-hour buckets over the trailing 24 hours, oldest first
pub fn decision_velocity(audit: &[AuditLogEntry], now: DateTime<Utc>) -> Vec<VelocityBucket> {
    let mut buckets = vec![VelocityBucket::default(); VELOCITY_BUCKETS];
    for entry in audit {
        let ts = match entry.parsed_timestamp() {
            Some(ts) => ts,
            None => continue,
        };
        let hours_ago = (now - ts).num_milliseconds() as f64 / 3_600_000.0;
        if !(0.0..VELOCITY_WINDOW_HOURS).contains(&hours_ago) {
            continue;
        }
        let idx = VELOCITY_BUCKETS as i64 - 1 - (hours_ago / VELOCITY_BUCKET_HOURS).floor() as i64;
        let bucket = match usize::try_from(idx).ok().and_then(|i| buckets.get_mut(i)) {
            Some(b) => b,
            None => continue,
        };
        if entry.action == PacketAction::AutoBlocked {
            bucket.automated += 1;
        } else {
            bucket.human += 1;
        }
    }
    buckets
}

/// Raw feeds the fallback is computed from.
///
/// All four must be fetched for the fallback to count as successful; the
/// threat histogram is drawn from the audit log.
#[derive(Debug, Clone, Default)]
pub struct FallbackInputs {
    pub health: SystemHealth,
    pub traffic: Vec<Packet>,
    pub pending: Vec<Packet>,
    pub audit: Vec<AuditLogEntry>,
}

pub fn derive_overview(inputs: &FallbackInputs, now: DateTime<Utc>) -> OverviewMetrics {
    let health = &inputs.health;
    let audit = &inputs.audit;

    let (severity_distribution, active_threats) = severity_histogram(audit.iter().map(|a| a.kind.as_str()));

    let blocked = audit.iter().filter(|a| a.action.is_block()).count() as u64;
    let false_positives = audit.iter().filter(|a| a.action == PacketAction::FalsePositive).count();
    let false_positive_rate = if audit.is_empty() {
        0.0
    } else {
        round_to(false_positives as f64 / audit.len() as f64 * 100.0, 2)
    };

    OverviewMetrics {
        status: health.status,
        traffic_processed: health.traffic_processed.clone(),
        traffic_change_percent: 0.0,
        traffic_bars_24h: vec![0.0; 12],
        system_health_score: match health.status {
            HealthStatus::Healthy => HEALTHY_SCORE,
            HealthStatus::Degraded => DEGRADED_SCORE,
        },
        automation_rate: health.automation_rate.clone(),
        automation_rate_value: parse_percent(&health.automation_rate),
        active_threats,
        blocked_ips_24h: blocked,
        avg_blocked_per_hour: round_to(blocked as f64 / 24.0, 1),
        mean_time_to_respond_seconds: 0.0,
        severity_distribution,
        decision_velocity: decision_velocity(audit, now),
        escalated_count: inputs.pending.len() as u64,
        analyst_hours_saved: round_to(blocked as f64 * MINUTES_SAVED_PER_BLOCK / 60.0, 1),
        false_positive_rate,
        auto_block_threshold_percent: AUTO_BLOCK_THRESHOLD_PERCENT,
        review_threshold_percent: REVIEW_THRESHOLD_PERCENT,
        db_latency_ms: 0.0,
        api_latency_ms: 0.0,
    }
}

/// Fetch the four raw feeds concurrently; the first failure aborts
pub async fn fetch_inputs(api: &dyn SoarApi) -> ConsoleResult<FallbackInputs> {
    let (health, traffic, pending, audit) = tokio::try_join!(
        api.system_health(),
        api.live_traffic(),
        api.pending_incidents(),
        api.audit_log(),
    )?;
    Ok(FallbackInputs { health, traffic, pending, audit })
}

pub async fn fallback_overview(api: &dyn SoarApi, now: DateTime<Utc>) -> ConsoleResult<OverviewMetrics> {
    let inputs = fetch_inputs(api).await?;
    Ok(derive_overview(&inputs, now))
}

/// Server aggregate when available, derived snapshot otherwise
pub async fn overview_with_fallback(api: &dyn SoarApi) -> ConsoleResult<OverviewMetrics> {
    match api.overview_metrics().await {
        Ok(metrics) => Ok(metrics),
        Err(e) => {
            tracing::debug!("Overview endpoint unavailable ({}), deriving metrics", e);
            fallback_overview(api, Utc::now()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use crate::testing::{audit_entry, healthy, packet, FakeApi};
    use chrono::Duration;

    fn at(now: DateTime<Utc>, hours_ago: i64) -> String {
        (now - Duration::hours(hours_ago)).to_rfc3339()
    }

    #[test]
    fn test_severity_rules() {
        assert_eq!(classify_severity("DDoS Attack"), Some(Severity::Critical));
        assert_eq!(classify_severity("Brute Force"), Some(Severity::High));
        assert_eq!(classify_severity("Port Scan"), Some(Severity::Medium));
        assert_eq!(classify_severity("Unknown Beacon"), Some(Severity::Low));
        assert_eq!(classify_severity("Normal Traffic"), None);
        // "dos" wins over "bot" because critical is checked first
        assert_eq!(classify_severity("DoS Botnet"), Some(Severity::Critical));
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("92.0%"), 92.0);
        assert_eq!(parse_percent(" 7.5 % "), 7.5);
        assert_eq!(parse_percent("n/a"), 0.0);
        assert_eq!(parse_percent(""), 0.0);
    }

    #[test]
    fn test_normal_traffic_excluded_from_histogram_and_count() {
        let now = Utc::now();
        let inputs = FallbackInputs {
            health: healthy("92.0%"),
            audit: vec![
                audit_entry(PacketAction::AutoBlocked, "DDoS Attack", Some(at(now, 1))),
                audit_entry(PacketAction::ManualBlock, "Brute Force", Some(at(now, 2))),
                audit_entry(PacketAction::FalsePositive, "Normal Traffic", Some(at(now, 3))),
                audit_entry(PacketAction::ManualBlock, "Port Scan", None),
                audit_entry(PacketAction::AutoBlocked, "Unknown Beacon", None),
            ],
            ..Default::default()
        };

        let metrics = derive_overview(&inputs, now);
        assert_eq!(metrics.active_threats, 4);
        assert_eq!(
            metrics.severity_distribution,
            SeverityDistribution { critical: 1, high: 1, medium: 1, low: 1 }
        );
    }

    #[test]
    fn test_blocked_count_and_rates() {
        let now = Utc::now();
        let mut audit = Vec::new();
        for _ in 0..30 {
            audit.push(audit_entry(PacketAction::AutoBlocked, "DDoS", None));
        }
        for _ in 0..7 {
            audit.push(audit_entry(PacketAction::ManualBlock, "SQL Injection", None));
        }
        for _ in 0..3 {
            audit.push(audit_entry(PacketAction::FalsePositive, "XSS", None));
        }
        let inputs = FallbackInputs { health: healthy("80.0%"), audit, ..Default::default() };

        let metrics = derive_overview(&inputs, now);
        assert_eq!(metrics.blocked_ips_24h, 37);
        assert_eq!(metrics.avg_blocked_per_hour, 1.5);
        assert_eq!(metrics.analyst_hours_saved, 9.3);
        assert_eq!(metrics.false_positive_rate, 7.5);
    }

    #[test]
    fn test_empty_audit_log() {
        let inputs = FallbackInputs { health: healthy("0.0%"), ..Default::default() };
        let metrics = derive_overview(&inputs, Utc::now());
        assert_eq!(metrics.false_positive_rate, 0.0);
        assert_eq!(metrics.blocked_ips_24h, 0);
        assert_eq!(metrics.decision_velocity, vec![VelocityBucket::default(); 6]);
    }

    #[test]
    fn test_decision_velocity_buckets() {
        let now = Utc::now();
        let audit = vec![
            audit_entry(PacketAction::AutoBlocked, "DDoS", Some(at(now, 1))),
            audit_entry(PacketAction::ManualBlock, "Brute Force", Some(at(now, 5))),
            audit_entry(PacketAction::FalsePositive, "XSS", Some(at(now, 23))),
            audit_entry(PacketAction::AutoBlocked, "DDoS", Some(at(now, 24))),
            audit_entry(PacketAction::AutoBlocked, "DDoS", Some(at(now, -2))),
            audit_entry(PacketAction::AutoBlocked, "DDoS", Some("not a date".into())),
        ];

        let velocity = decision_velocity(&audit, now);
        assert_eq!(velocity[5], VelocityBucket { automated: 1, human: 0 });
        assert_eq!(velocity[4], VelocityBucket { automated: 0, human: 1 });
        assert_eq!(velocity[0], VelocityBucket { automated: 0, human: 1 });
        let total: u64 = velocity.iter().map(|b| b.automated + b.human).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_health_fields_carried_over() {
        let inputs = FallbackInputs {
            health: healthy("92.0%"),
            pending: vec![packet(1, "SQL Injection"), packet(2, "Port Scan")],
            ..Default::default()
        };
        let metrics = derive_overview(&inputs, Utc::now());
        assert_eq!(metrics.status, HealthStatus::Healthy);
        assert_eq!(metrics.traffic_processed, "1.2k");
        assert_eq!(metrics.automation_rate_value, 92.0);
        assert_eq!(metrics.system_health_score, 98.0);
        assert_eq!(metrics.escalated_count, 2);
        assert_eq!(metrics.auto_block_threshold_percent, 95.0);
        assert_eq!(metrics.review_threshold_percent, 85.0);
    }

    #[tokio::test]
    async fn test_fallback_used_when_overview_endpoint_fails() {
        let api = FakeApi::new();
        *api.health.lock() = Ok(healthy("92.0%"));

        let metrics = overview_with_fallback(&api).await.unwrap();
        assert_eq!(metrics.automation_rate_value, 92.0);
        assert_eq!(api.calls("overview_metrics"), 1);
        assert_eq!(api.calls("audit_log"), 1);
    }

    #[tokio::test]
    async fn test_server_overview_preferred() {
        let api = FakeApi::new();
        let served = OverviewMetrics { active_threats: 11, ..Default::default() };
        *api.overview.lock() = Some(served.clone());

        assert_eq!(overview_with_fallback(&api).await.unwrap(), served);
        assert_eq!(api.calls("audit_log"), 0);
    }

    #[tokio::test]
    async fn test_fallback_fails_if_any_feed_fails() {
        let api = FakeApi::new();
        *api.audit_error.lock() = Some(ConsoleError::Network("reset".into()));

        let err = overview_with_fallback(&api).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Network(_)));
    }
}
