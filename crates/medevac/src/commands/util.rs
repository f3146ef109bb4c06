//! Shared helpers for command handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use medevac_core::{EmergencyId, EmergencySnapshot, EmergencyStatus, KeyValueStore, transition};

use crate::config::Context;
use crate::error::CliError;
use crate::output;

/// Load a timeline that must already be stored.
///
/// Unlike `medevac load`, never seeds a new record.
pub async fn load_existing(ctx: &Context, id: &EmergencyId) -> Result<EmergencySnapshot, CliError> {
    if ctx.engine.store().get(&id.timeline_key()).await?.is_none() {
        return Err(CliError::NotFound { id: id.to_string() });
    }
    Ok(ctx.engine.load(id, None).await?)
}

/// Successors of `from`, comma-separated, for help text.
pub fn allowed_list(from: EmergencyStatus) -> String {
    let next = transition::allowed_from(from);
    if next.is_empty() {
        return "none (terminal status)".into();
    }
    next.iter()
        .map(|s| s.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Status view ─────────────────────────────────────────────────────

/// Serializable summary shared by `load`, `status` and `transition`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub id: EmergencyId,
    pub status: EmergencyStatus,
    pub label: &'static str,
    pub since: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub entries: usize,
    pub next: Vec<EmergencyStatus>,
}

impl StatusView {
    pub fn new(snapshot: &EmergencySnapshot, now: DateTime<Utc>) -> Self {
        Self {
            id: snapshot.id.clone(),
            status: snapshot.status,
            label: snapshot.status.label(),
            since: snapshot.history.last().map(medevac_core::StateChange::timestamp),
            elapsed_secs: snapshot.elapsed_at(now).as_secs(),
            entries: snapshot.history.len(),
            next: transition::allowed_from(snapshot.status).to_vec(),
        }
    }
}

pub fn print_status(ctx: &Context, snapshot: &EmergencySnapshot) -> Result<(), CliError> {
    let view = StatusView::new(snapshot, Utc::now());
    let out = output::render_single(
        ctx.output,
        &view,
        |v| {
            output::detail_block(&[
                ("ID", v.id.to_string()),
                (
                    "Status",
                    format!("{} ({})", output::paint_status(v.status, ctx.color), v.label),
                ),
                ("Since", v.since.map(format_time).unwrap_or_default()),
                (
                    "Elapsed",
                    output::format_elapsed(std::time::Duration::from_secs(v.elapsed_secs)),
                ),
                ("Entries", v.entries.to_string()),
                ("Next", allowed_list(v.status)),
            ])
        },
        |v| v.status.to_string(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
