//! Overview command

use super::Context;
use crate::output::{self, Field};
use sentinel_console::pollers::overview_poller;
use sentinel_console::OverviewMetrics;
use tabled::Tabled;

#[derive(Tabled)]
struct VelocityRow {
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Automated")]
    automated: u64,
    #[tabled(rename = "Human")]
    human: u64,
}

fn render(ctx: &Context, m: &OverviewMetrics) {
    if !ctx.format.is_table() {
        ctx.format.print(m);
        return;
    }

    println!("System status: {}", output::health_status(m.status));
    let sev = &m.severity_distribution;
    let rows = vec![
        Field::new("Traffic processed", &m.traffic_processed),
        Field::new("Automation rate", &m.automation_rate),
        Field::new("Health score", m.system_health_score),
        Field::new("Active threats", m.active_threats),
        Field::new("Blocked IPs", format!("{} ({}/h)", m.blocked_ips_24h, m.avg_blocked_per_hour)),
        Field::new("Escalated", m.escalated_count),
        Field::new("Analyst hours saved", m.analyst_hours_saved),
        Field::new("False positive rate", format!("{}%", m.false_positive_rate)),
        Field::new(
            "Severity",
            format!("critical {} / high {} / medium {} / low {}", sev.critical, sev.high, sev.medium, sev.low),
        ),
        Field::new(
            "Thresholds",
            format!("auto-block {}% / review {}%", m.auto_block_threshold_percent, m.review_threshold_percent),
        ),
    ];
    ctx.format.print_rows(m, rows);

    let buckets = m.decision_velocity.len();
    let velocity: Vec<VelocityRow> = m
        .decision_velocity
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let end = (buckets - 1 - i) * 4;
            VelocityRow {
                window: format!("-{}h..-{}h", end + 4, end),
                automated: b.automated,
                human: b.human,
            }
        })
        .collect();
    println!("Decision velocity");
    ctx.format.print_rows(&m.decision_velocity, velocity);
}

pub async fn handle(ctx: &Context, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let metrics = sentinel_console::aggregator::overview_with_fallback(ctx.api.as_ref()).await?;
        render(ctx, &metrics);
        return Ok(());
    }

    let poller = overview_poller(ctx.api.clone());
    super::watch(&poller, ctx.config.poll.metrics(), |state| render(ctx, &state.data)).await
}
