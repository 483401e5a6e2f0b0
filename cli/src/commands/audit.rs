//! Audit log commands

use super::Context;
use crate::commands::incidents::ActionRow;
use crate::output::Field;
use crate::{AuditCommands, ExportChoice};
use chrono::Utc;
use colored::Colorize;
use sentinel_console::compliance::{self, ExportFormat};

pub async fn handle(action: AuditCommands, ctx: &Context) -> anyhow::Result<()> {
    let entries = ctx.api.audit_log().await?;

    match action {
        AuditCommands::List { limit } => {
            let stats = compliance::audit_stats(&entries);
            let shown = &entries[..entries.len().min(limit)];
            if ctx.format.is_table() {
                let summary = vec![
                    Field::new("Total", stats.total),
                    Field::new("Blocks", stats.blocks),
                    Field::new("Automation rate", format!("{}%", stats.automation_rate)),
                ];
                ctx.format.print_rows(&stats, summary);
                ctx.format.print_rows(shown, shown.iter().map(ActionRow::from).collect());
            } else {
                ctx.format.print(&serde_json::json!({ "stats": stats, "entries": shown }));
            }
        }
        AuditCommands::Export { export_format, out } => {
            let format = match export_format {
                ExportChoice::Csv => ExportFormat::Csv,
                ExportChoice::Json => ExportFormat::Json,
            };
            let path = compliance::write_export(&out, &entries, format, Utc::now())?;
            println!(
                "{} exported {} entries to {}",
                "✓".green().bold(),
                entries.len(),
                path.display()
            );
        }
    }
    Ok(())
}
