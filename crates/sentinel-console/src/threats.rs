//! Threat map summaries

use crate::aggregator::{classify_severity, Severity};
use crate::models::ThreatPoint;
use serde::Serialize;
use std::collections::HashMap;

const UNKNOWN_COUNTRY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySummary {
    pub country: String,
    pub threats: usize,
    /// Most frequent threat type in the country
    pub top_type: String,
    pub worst_severity: Option<Severity>,
}

fn rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 3,
        Severity::High => 2,
        Severity::Medium => 1,
        Severity::Low => 0,
    }
}

/// Group points by country, busiest first
pub fn summarize_by_country(points: &[ThreatPoint]) -> Vec<CountrySummary> {
    let mut groups: HashMap<&str, Vec<&ThreatPoint>> = HashMap::new();
    for point in points {
        let country = match point.country.trim() {
            "" => UNKNOWN_COUNTRY,
            c => c,
        };
        groups.entry(country).or_default().push(point);
    }

    let mut summaries: Vec<CountrySummary> = groups
        .into_iter()
        .map(|(country, points)| {
            let mut by_type: HashMap<&str, usize> = HashMap::new();
            for p in &points {
                *by_type.entry(p.kind.as_str()).or_default() += 1;
            }
            let top_type = by_type
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(kind, _)| kind.to_string())
                .unwrap_or_default();
            let worst_severity = points
                .iter()
                .filter_map(|p| classify_severity(&p.kind))
                .max_by_key(|s| rank(*s));
            CountrySummary {
                country: country.to_string(),
                threats: points.len(),
                top_type,
                worst_severity,
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.threats.cmp(&a.threats).then_with(|| a.country.cmp(&b.country)));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: i64, country: &str, kind: &str) -> ThreatPoint {
        ThreatPoint {
            id,
            lat: Some(0.0),
            lon: Some(0.0),
            kind: kind.into(),
            src_ip: format!("198.51.100.{}", id),
            country: country.into(),
        }
    }

    #[test]
    fn test_summary_by_country() {
        let points = vec![
            point(1, "CN", "Port Scan"),
            point(2, "CN", "DDoS"),
            point(3, "CN", "Port Scan"),
            point(4, "RU", "Brute Force"),
            point(5, "", "XSS"),
        ];

        let summary = summarize_by_country(&points);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].country, "CN");
        assert_eq!(summary[0].threats, 3);
        assert_eq!(summary[0].top_type, "Port Scan");
        assert_eq!(summary[0].worst_severity, Some(Severity::Critical));
        assert_eq!(summary[1].country, "RU");
        assert_eq!(summary[2].country, UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_empty_map() {
        assert!(summarize_by_country(&[]).is_empty());
    }
}
