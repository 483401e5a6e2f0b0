//! Incident queue commands

use super::Context;
use crate::commands::traffic::PacketRow;
use crate::output;
use crate::{IncidentCommands, ResolveChoice};
use anyhow::Context as _;
use colored::Colorize;
use sentinel_console::{AdminDesk, AdminSnapshot, AuditLogEntry, DataMode, ResolutionBus, ResolveAction};
use tabled::Tabled;

#[derive(Tabled)]
pub struct ActionRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Source")]
    src_ip: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Handled by")]
    handled_by: String,
}

impl From<&AuditLogEntry> for ActionRow {
    fn from(e: &AuditLogEntry) -> Self {
        Self {
            time: output::time(e.timestamp.as_deref()),
            src_ip: e.src_ip.clone(),
            kind: e.kind.clone(),
            action: e.action.to_string(),
            handled_by: e.handled_by.clone(),
        }
    }
}

fn render(ctx: &Context, snapshot: &AdminSnapshot, recent: bool) {
    if !ctx.format.is_table() {
        ctx.format.print(snapshot);
        return;
    }
    println!("Open tickets: {}", snapshot.open_tickets.to_string().bold());
    ctx.format
        .print_rows(&snapshot.pending, snapshot.pending.iter().map(PacketRow::from).collect());
    if recent {
        println!("Recent actions");
        ctx.format.print_rows(
            &snapshot.recent_actions,
            snapshot.recent_actions.iter().map(ActionRow::from).collect(),
        );
    }
}

pub async fn handle(action: IncidentCommands, ctx: &Context) -> anyhow::Result<()> {
    let desk = AdminDesk::new(ctx.api.clone(), ResolutionBus::new());

    match action {
        IncidentCommands::List { recent, watch } => {
            if watch {
                return super::watch(desk.poller(), ctx.config.poll.admin(), |state| {
                    render(ctx, &state.data, recent)
                })
                .await;
            }
            desk.refresh().await?;
            render(ctx, &desk.snapshot().data, recent);
        }
        IncidentCommands::Resolve { id, action } => {
            let action = match action {
                ResolveChoice::Block => ResolveAction::Block,
                ResolveChoice::Ignore => ResolveAction::Ignore,
            };
            let resolved = desk.resolve_pending(id, action).await;
            if ctx.config.mode == DataMode::Simulation && ctx.config.simulation_seed.is_none() {
                resolved.context("simulated incidents only exist within one run; set simulation_seed for stable ids")?;
            } else {
                resolved?;
            }
            println!(
                "{} incident {} resolved with {}",
                "✓".green().bold(),
                id,
                action.as_str().bold()
            );
            let remaining = desk.snapshot().data.open_tickets;
            println!("Open tickets: {}", remaining);
        }
    }
    Ok(())
}
