//! Health command

use super::Context;
use crate::output::{self, Field};
use sentinel_console::pollers::health_poller;
use sentinel_console::SystemHealth;

fn render(ctx: &Context, health: &SystemHealth) {
    if ctx.format.is_table() {
        println!("System status: {}", output::health_status(health.status));
    }
    let rows = vec![
        Field::new("Uptime", format!("{}s", health.uptime_seconds)),
        Field::new("Traffic processed", &health.traffic_processed),
        Field::new("Automation rate", &health.automation_rate),
    ];
    ctx.format.print_rows(health, rows);
}

pub async fn handle(ctx: &Context, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let health = ctx.api.system_health().await?;
        render(ctx, &health);
        return Ok(());
    }

    let poller = health_poller(ctx.api.clone());
    super::watch(&poller, ctx.config.poll.health(), |state| {
        if let Some(health) = &state.data {
            render(ctx, health);
        }
    })
    .await
}
