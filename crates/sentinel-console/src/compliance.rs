//! Compliance reporting over the audit log

use crate::aggregator::round_to;
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::AuditLogEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Handler name recorded for automatic decisions
pub const AUTOMATION_HANDLER: &str = "SYSTEM_AUTOMATION";

const CSV_HEADER: &str = "id,timestamp,src_ip,type,action,handled_by,model_version";

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Summary shown above the audit table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub blocks: usize,
    /// Share of entries handled without an analyst, percent with one decimal
    pub automation_rate: f64,
}

pub fn audit_stats(entries: &[AuditLogEntry]) -> AuditStats {
    let total = entries.len();
    let blocks = entries.iter().filter(|e| e.action.as_str().contains("BLOCK")).count();
    let automated = entries.iter().filter(|e| e.handled_by == AUTOMATION_HANDLER).count();
    let automation_rate = if total == 0 {
        0.0
    } else {
        round_to(automated as f64 / total as f64 * 100.0, 1)
    };
    AuditStats { total, blocks, automation_rate }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn to_csv(entries: &[AuditLogEntry]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for e in entries {
        let id = e.id.map(|id| id.to_string()).unwrap_or_default();
        let row = [
            id.as_str(),
            e.timestamp.as_deref().unwrap_or(""),
            e.src_ip.as_str(),
            e.kind.as_str(),
            e.action.as_str(),
            e.handled_by.as_str(),
            e.model_version.as_deref().unwrap_or(""),
        ];
        csv.push('\n');
        csv.push_str(&row.iter().map(|f| quote(f)).collect::<Vec<_>>().join(","));
    }
    csv
}

pub fn export(entries: &[AuditLogEntry], format: ExportFormat) -> ConsoleResult<String> {
    match format {
        ExportFormat::Csv => Ok(to_csv(entries)),
        ExportFormat::Json => serde_json::to_string_pretty(entries).map_err(|e| ConsoleError::Decode(e.to_string())),
    }
}

/// `audit_logs_<yyyyMMdd_HHmmss>.<ext>`
pub fn export_file_name(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!("audit_logs_{}.{}", at.format("%Y%m%d_%H%M%S"), format.extension())
}

/// Write an export into `dir`, returning the created file
pub fn write_export(
    dir: &Path,
    entries: &[AuditLogEntry],
    format: ExportFormat,
    at: DateTime<Utc>,
) -> ConsoleResult<PathBuf> {
    let body = export(entries, format)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(format, at));
    std::fs::write(&path, body)?;
    tracing::info!(path = %path.display(), entries = entries.len(), "audit log exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PacketAction;
    use crate::testing::audit_entry;
    use chrono::TimeZone;

    fn sample() -> Vec<AuditLogEntry> {
        let mut auto = audit_entry(PacketAction::AutoBlocked, "DDoS", Some("2024-05-01T10:00:00".into()));
        auto.id = Some(1);
        auto.model_version = Some("v2.1".into());
        let mut manual = audit_entry(PacketAction::ManualBlock, "SQL \"Injection\"", None);
        manual.id = Some(2);
        let ignored = audit_entry(PacketAction::FalsePositive, "XSS, reflected", None);
        vec![auto, manual, ignored]
    }

    #[test]
    fn test_stats() {
        let stats = audit_stats(&sample());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.automation_rate, 33.3);
        assert_eq!(audit_stats(&[]), AuditStats::default());
    }

    #[test]
    fn test_csv_quotes_every_field() {
        let csv = to_csv(&sample());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            r#""1","2024-05-01T10:00:00","10.9.9.9","DDoS","AUTO_BLOCKED","SYSTEM_AUTOMATION","v2.1""#
        );
        assert_eq!(
            lines[2],
            r#""2","","10.9.9.9","SQL ""Injection""","MANUAL_BLOCK","admin_user","""#
        );
        assert!(lines[3].contains(r#""XSS, reflected""#));
    }

    #[test]
    fn test_unmodelled_action_labels_are_kept() {
        let mut entries = sample();
        entries.push(audit_entry(PacketAction::Other("QUARANTINE_BLOCK".into()), "Bot", None));

        assert_eq!(audit_stats(&entries).blocks, 3);
        let csv = to_csv(&entries);
        assert!(csv.lines().last().unwrap().contains(r#""QUARANTINE_BLOCK""#));
        let json = export(&entries, ExportFormat::Json).unwrap();
        assert!(json.contains(r#""action": "QUARANTINE_BLOCK""#));
    }

    #[test]
    fn test_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!(export_file_name(ExportFormat::Csv, at), "audit_logs_20240501_090307.csv");
        assert_eq!(export_file_name(ExportFormat::Json, at), "audit_logs_20240501_090307.json");
    }

    #[test]
    fn test_write_json_export() {
        let dir = std::env::temp_dir().join(format!("sentinel-export-{}", uuid::Uuid::new_v4()));
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();

        let path = write_export(&dir, &sample(), ExportFormat::Json, at).unwrap();
        let written: Vec<AuditLogEntry> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, sample());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
