//! Read-side handlers: load, status, history, elapsed.

use serde::Serialize;
use tabled::Tabled;

use medevac_core::{EmergencyId, EmergencyStatus, StateChange};

use crate::cli::{IdArgs, LoadArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "At")]
    at: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

/// Timeline entry with its 1-based position; serializes as the bare change.
#[derive(Serialize)]
struct HistoryEntry<'a> {
    #[serde(skip)]
    index: usize,
    #[serde(flatten)]
    change: &'a StateChange,
}

#[derive(Serialize)]
struct ElapsedView {
    id: EmergencyId,
    status: EmergencyStatus,
    elapsed_secs: u64,
    elapsed: String,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn load(ctx: &Context, args: LoadArgs) -> Result<(), CliError> {
    let snapshot = ctx.engine.load(&args.id, args.initial).await?;
    util::print_status(ctx, &snapshot)
}

pub async fn status(ctx: &Context, args: IdArgs) -> Result<(), CliError> {
    let snapshot = util::load_existing(ctx, &args.id).await?;
    util::print_status(ctx, &snapshot)
}

pub async fn history(ctx: &Context, args: IdArgs) -> Result<(), CliError> {
    let snapshot = util::load_existing(ctx, &args.id).await?;
    let entries: Vec<HistoryEntry<'_>> = snapshot
        .history
        .iter()
        .enumerate()
        .map(|(i, change)| HistoryEntry {
            index: i + 1,
            change,
        })
        .collect();

    let out = output::render_list(
        ctx.output,
        &entries,
        |e| HistoryRow {
            index: e.index,
            status: output::paint_status(e.change.status(), ctx.color),
            at: util::format_time(e.change.timestamp()),
            location: e
                .change
                .location()
                .map(|c| format!("{:.5}, {:.5}", c.latitude, c.longitude))
                .unwrap_or_default(),
            notes: e.change.notes().unwrap_or_default().to_owned(),
        },
        |e| format!("{} {}", e.change.timestamp().to_rfc3339(), e.change.status()),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn elapsed(ctx: &Context, args: IdArgs) -> Result<(), CliError> {
    let snapshot = util::load_existing(ctx, &args.id).await?;
    let elapsed = ctx
        .engine
        .elapsed_in_current_state(&args.id)
        .unwrap_or_default();

    let view = ElapsedView {
        id: snapshot.id,
        status: snapshot.status,
        elapsed_secs: elapsed.as_secs(),
        elapsed: output::format_elapsed(elapsed),
    };
    let out = output::render_single(
        ctx.output,
        &view,
        |v| {
            format!(
                "{} in {} for {}",
                v.id,
                output::paint_status(v.status, ctx.color),
                v.elapsed
            )
        },
        |v| v.elapsed.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
