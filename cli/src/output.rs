//! Output formatting

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use sentinel_console::aggregator::Severity;
use sentinel_console::HealthStatus;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn print<T: Serialize>(&self, data: &T) {
        match self {
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(data).unwrap_or_default());
            }
        }
    }

    /// Table rows for `table`, the serialized data otherwise
    pub fn print_rows<T, R>(&self, data: &T, rows: Vec<R>)
    where
        T: Serialize + ?Sized,
        R: Tabled,
    {
        match self {
            OutputFormat::Table => {
                if rows.is_empty() {
                    println!("{}", "(none)".dimmed());
                } else {
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(data).unwrap_or_default()),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, OutputFormat::Table)
    }
}

/// Two-column row for key/value views
#[derive(Tabled)]
pub struct Field {
    #[tabled(rename = "Field")]
    pub name: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl Field {
    pub fn new(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

pub fn health_status(status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Healthy => "HEALTHY".green().bold(),
        HealthStatus::Degraded => "DEGRADED".yellow().bold(),
    }
}

pub fn severity_label(severity: Option<Severity>) -> &'static str {
    match severity {
        Some(Severity::Critical) => "critical",
        Some(Severity::High) => "high",
        Some(Severity::Medium) => "medium",
        Some(Severity::Low) => "low",
        None => "-",
    }
}

/// Short local time for a backend timestamp
pub fn time(raw: Option<&str>) -> String {
    match raw.and_then(sentinel_console::parse_timestamp) {
        Some(ts) => ts
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => raw.unwrap_or("-").to_string(),
    }
}

/// Notice printed after the data, on stderr so piped output stays clean
pub fn warn(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}
