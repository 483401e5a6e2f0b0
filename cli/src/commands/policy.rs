//! Policy commands

use super::Context;
use crate::output::Field;
use crate::PolicyCommands;
use colored::Colorize;
use sentinel_console::{PolicyConfig, PolicyUpdate};

fn rows(config: &PolicyConfig, model_version: Option<&str>) -> Vec<Field> {
    vec![
        Field::new("Auto-block threshold", config.auto_block_threshold),
        Field::new("Dynamic threshold", config.dynamic_threshold_enabled),
        Field::new("Threshold range", format!("{} - {}", config.min_threshold, config.max_threshold)),
        Field::new("Model noise rate", config.model_noise_rate),
        Field::new("Auto-resolve pending", config.auto_resolve_pending_enabled),
        Field::new("Queue trigger", config.pending_auto_resolve_queue_trigger),
        Field::new("Auto-resolve delta", config.pending_auto_resolve_delta),
        Field::new("Model version", model_version.unwrap_or("-")),
    ]
}

pub async fn handle(action: PolicyCommands, ctx: &Context) -> anyhow::Result<()> {
    match action {
        PolicyCommands::Show => {
            let current = ctx.api.current_config().await?;
            ctx.format
                .print_rows(&current, rows(&current.config, current.model_version.as_deref()));
        }
        PolicyCommands::Set {
            threshold,
            dynamic_threshold,
            noise_rate,
            min_threshold,
            max_threshold,
            auto_resolve,
            queue_trigger,
            resolve_delta,
        } => {
            let update = PolicyUpdate {
                threshold,
                dynamic_threshold_enabled: dynamic_threshold,
                model_noise_rate: noise_rate,
                min_threshold,
                max_threshold,
                auto_resolve_pending_enabled: auto_resolve,
                pending_auto_resolve_queue_trigger: queue_trigger,
                pending_auto_resolve_delta: resolve_delta,
            };
            if update.is_empty() {
                anyhow::bail!("nothing to update; pass at least one field (see --help)");
            }
            update.validate().map_err(|e| anyhow::anyhow!(e))?;

            let resp = ctx.api.update_config(&update).await?;
            println!("{} policy {}", "✓".green().bold(), resp.status);
            ctx.format.print_rows(&resp.config, rows(&resp.config, None));
        }
    }
    Ok(())
}
