//! Trend and reading-log handlers.
//!
//! Both endpoints return an envelope whose `data` is passed through
//! unmodified for structured output; the table view flattens the usual
//! point shapes into rows.

use chrono::Utc;
use serde_json::Value;
use tabled::Tabled;

use bmsdash_core::{Envelope, LogQuery, TimeWindow, TrendQuery};

use crate::cli::{LogsArgs, OutputFormat, TrendArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Value")]
    value: String,
}

const TIME_KEYS: &[&str] = &["timestamp", "time", "ts", "createdAt"];
const VALUE_KEYS: &[&str] = &["value", "val", "reading"];

/// Series points: `data` itself, or its `items` / `series` / `points` array.
fn points(data: &Value) -> &[Value] {
    if let Some(arr) = data.as_array() {
        return arr;
    }
    ["items", "series", "points"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn scalar(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), str::to_owned)
}

impl PointRow {
    fn new(point: &Value, parameter: Option<&str>) -> Self {
        let time = TIME_KEYS
            .iter()
            .find_map(|k| point.get(*k))
            .map(scalar)
            .unwrap_or_default();
        let value = parameter
            .and_then(|p| point.get(p))
            .or_else(|| VALUE_KEYS.iter().find_map(|k| point.get(*k)))
            .map_or_else(|| point.to_string(), scalar);
        Self { time, value }
    }
}

fn render_series(
    ctx: &Context<'_>,
    envelope: &Envelope<Value>,
    parameter: Option<&str>,
) -> String {
    let items = points(&envelope.data);
    match ctx.global.output {
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            &ctx.global.output,
            items,
            |p| PointRow::new(p, parameter),
            |p| {
                let row = PointRow::new(p, parameter);
                format!("{}\t{}", row.time, row.value)
            },
        ),
        _ => output::render_single(&ctx.global.output, envelope, |_| String::new(), |_| {
            String::new()
        }),
    }
}

fn warn_unsuccessful(ctx: &Context<'_>, envelope: &Envelope<Value>) {
    if !envelope.success && !ctx.global.quiet {
        eprintln!(
            "warning: backend reported failure: {}",
            envelope.message.as_deref().unwrap_or("no message")
        );
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn trend(ctx: &Context<'_>, args: TrendArgs) -> Result<(), CliError> {
    let window = match (args.start, args.end) {
        (Some(start), Some(end)) => TimeWindow { start, end },
        _ => TimeWindow::last_hours(args.hours, Utc::now()),
    };
    if window.start >= window.end {
        return Err(CliError::Validation {
            field: "window".into(),
            reason: "start must be before end".into(),
        });
    }

    let mut query = TrendQuery::new(args.parameter.as_str()).with_window(window);
    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    let envelope = ctx
        .with_spinner(
            "Fetching trend",
            ctx.dashboard.trend(args.domain, &args.machine, &query),
        )
        .await
        .map_err(|e| ctx.fail(e))?;

    warn_unsuccessful(ctx, &envelope);
    let out = render_series(ctx, &envelope, Some(args.parameter.as_str()));
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

pub async fn logs(ctx: &Context<'_>, args: LogsArgs) -> Result<(), CliError> {
    let query = LogQuery {
        start: args.start,
        end: args.end,
        limit: args.limit,
        offset: args.offset,
    };
    let envelope = ctx
        .with_spinner(
            "Fetching logs",
            ctx.dashboard.logs(args.domain, &args.machine, &query),
        )
        .await
        .map_err(|e| ctx.fail(e))?;

    warn_unsuccessful(ctx, &envelope);
    let out = render_series(ctx, &envelope, None);
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}
