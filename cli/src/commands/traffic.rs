//! Live traffic command

use super::Context;
use crate::output;
use sentinel_console::pollers::live_traffic_poller;
use sentinel_console::Packet;
use tabled::Tabled;

#[derive(Tabled)]
pub struct PacketRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Source")]
    src_ip: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Conf")]
    confidence: String,
    #[tabled(rename = "Action")]
    action: String,
}

impl From<&Packet> for PacketRow {
    fn from(p: &Packet) -> Self {
        Self {
            id: p.id,
            time: output::time(p.timestamp.as_deref()),
            src_ip: p.src_ip.clone(),
            country: p.country.clone().unwrap_or_else(|| "-".into()),
            kind: p.kind.clone(),
            confidence: format!("{}%", p.confidence_percent()),
            action: p.action.to_string(),
        }
    }
}

fn render(ctx: &Context, packets: &[Packet], limit: usize) {
    let shown = &packets[..packets.len().min(limit)];
    ctx.format.print_rows(shown, shown.iter().map(PacketRow::from).collect());
}

pub async fn handle(ctx: &Context, watch: bool, limit: usize) -> anyhow::Result<()> {
    if !watch {
        let packets = ctx.api.live_traffic().await?;
        render(ctx, &packets, limit);
        return Ok(());
    }

    let poller = live_traffic_poller(ctx.api.clone());
    super::watch(&poller, ctx.config.poll.live_traffic(), |state| render(ctx, &state.data, limit)).await
}
