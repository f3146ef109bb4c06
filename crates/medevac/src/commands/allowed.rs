//! `medevac allowed`: print or query the transition table.

use serde::Serialize;
use tabled::Tabled;

use medevac_core::{EmergencyStatus, transition};

use crate::cli::AllowedArgs;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct Edges {
    from: EmergencyStatus,
    to: Vec<EmergencyStatus>,
}

#[derive(Tabled)]
struct EdgesRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Allowed next")]
    to: String,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Label")]
    label: &'static str,
}

#[derive(Serialize)]
struct EdgeCheck {
    from: EmergencyStatus,
    to: EmergencyStatus,
    allowed: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(ctx: &Context, args: &AllowedArgs) -> Result<(), CliError> {
    let out = match (args.from, args.to) {
        (None, _) => {
            let edges: Vec<Edges> = transition::table()
                .map(|(from, to)| Edges {
                    from,
                    to: to.to_vec(),
                })
                .collect();
            output::render_list(
                ctx.output,
                &edges,
                |e| EdgesRow {
                    from: output::paint_status(e.from, ctx.color),
                    to: util::allowed_list(e.from),
                },
                |e| format!("{}: {}", e.from, util::allowed_list(e.from)),
            )?
        }
        (Some(from), None) => output::render_list(
            ctx.output,
            transition::allowed_from(from),
            |s| StatusRow {
                status: output::paint_status(*s, ctx.color),
                label: s.label(),
            },
            ToString::to_string,
        )?,
        (Some(from), Some(to)) => {
            if !ctx.engine.is_transition_allowed(from, to) {
                return Err(CliError::Rejected {
                    from,
                    to,
                    allowed: util::allowed_list(from),
                });
            }
            output::render_single(
                ctx.output,
                &EdgeCheck {
                    from,
                    to,
                    allowed: true,
                },
                |c| format!("{} -> {} is allowed", c.from, c.to),
                |_| "yes".into(),
            )?
        }
    };
    output::print_output(&out, ctx.quiet);
    Ok(())
}
