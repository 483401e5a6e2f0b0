//! Threat map command

use super::Context;
use crate::output;
use sentinel_console::aggregator::classify_severity;
use sentinel_console::threats::summarize_by_country;
use tabled::Tabled;

#[derive(Tabled)]
struct CountryRow {
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Threats")]
    threats: usize,
    #[tabled(rename = "Top type")]
    top_type: String,
    #[tabled(rename = "Worst")]
    worst: String,
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Source")]
    src_ip: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Lat/Lon")]
    position: String,
}

fn coord(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into())
}

pub async fn handle(ctx: &Context, points: bool) -> anyhow::Result<()> {
    let map = ctx.api.threat_map().await?;

    if points {
        let rows = map
            .iter()
            .map(|p| PointRow {
                id: p.id,
                src_ip: p.src_ip.clone(),
                country: p.country.clone(),
                kind: p.kind.clone(),
                severity: output::severity_label(classify_severity(&p.kind)).to_string(),
                position: format!("{}, {}", coord(p.lat), coord(p.lon)),
            })
            .collect();
        ctx.format.print_rows(&map, rows);
        return Ok(());
    }

    let summary = summarize_by_country(&map);
    let rows = summary
        .iter()
        .map(|s| CountryRow {
            country: s.country.clone(),
            threats: s.threats,
            top_type: s.top_type.clone(),
            worst: output::severity_label(s.worst_severity).to_string(),
        })
        .collect();
    ctx.format.print_rows(&summary, rows);
    Ok(())
}
