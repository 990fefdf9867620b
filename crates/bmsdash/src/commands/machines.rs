//! Machine list and fleet summary handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use bmsdash_core::{EnrichedMachine, FleetSummary};

use crate::cli::{DomainArg, MachinesArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MachineRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reading")]
    reading: String,
    #[tabled(rename = "Today")]
    today: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl MachineRow {
    fn new(m: &EnrichedMachine, color: bool) -> Self {
        let reading = m
            .reading
            .channels()
            .into_iter()
            .map(|(label, value, unit)| format!("{label} {}", output::metric(Some(value), unit)))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            id: m.id.to_string(),
            name: m.name.clone(),
            status: output::paint_status(m.status, color),
            reading,
            today: output::metric(m.energy.today, "kWh"),
            last_seen: m
                .last_seen_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(ctx: &Context<'_>, args: MachinesArgs) -> Result<(), CliError> {
    let domain = ctx.resolve_domain(args.domain.domain)?;
    let envelope = ctx
        .with_spinner(
            &format!("Fetching {domain} machines"),
            ctx.dashboard.machines(domain),
        )
        .await
        .map_err(|e| ctx.fail(e))?;

    if !envelope.success && !ctx.global.quiet {
        eprintln!(
            "warning: backend reported failure: {}",
            envelope.message.as_deref().unwrap_or("no message")
        );
    }

    let machines: Vec<EnrichedMachine> = envelope
        .data
        .items
        .into_iter()
        .filter(|m| !args.online || m.status.is_online())
        .collect();

    let color = output::should_color(&ctx.global.color);
    let out = output::render_list(
        &ctx.global.output,
        &machines,
        |m| MachineRow::new(m, color),
        |m| m.id.to_string(),
    );
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

fn summary_detail(s: &FleetSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Machines       {}", s.total);
    let _ = writeln!(out, "Online         {}", s.online);
    let _ = writeln!(out, "Offline        {}", s.offline);
    let _ = writeln!(out, "Alarm          {}", s.alarm);
    if s.energy_today.is_some() || s.energy_month_to_date.is_some() {
        let _ = writeln!(out, "Energy today   {}", output::metric(s.energy_today, "kWh"));
        let _ = writeln!(
            out,
            "Month to date  {}",
            output::metric(s.energy_month_to_date, "kWh")
        );
    }
    out.trim_end().to_owned()
}

pub async fn summary(ctx: &Context<'_>, arg: DomainArg) -> Result<(), CliError> {
    let domain = ctx.resolve_domain(arg.domain)?;
    let summary = ctx
        .with_spinner(
            &format!("Summarizing {domain} machines"),
            ctx.dashboard.summary(domain),
        )
        .await
        .map_err(|e| ctx.fail(e))?;

    let out = output::render_single(&ctx.global.output, &summary, summary_detail, |s| {
        format!("{} {} {} {}", s.total, s.online, s.offline, s.alarm)
    });
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_detail_omits_energy_when_unknown() {
        let text = summary_detail(&FleetSummary {
            total: 4,
            online: 3,
            offline: 1,
            ..FleetSummary::default()
        });
        assert!(text.contains("Machines       4"));
        assert!(!text.contains("Energy"));
    }
}
