//! `medevac proximity`: feed one distance reading to the policy.

use serde::Serialize;

use medevac_core::{EmergencyId, EmergencyStatus, TransitionOutcome, haversine_km};

use crate::cli::ProximityArgs;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ProximityView {
    id: EmergencyId,
    distance_km: f64,
    threshold_km: f64,
    advanced: bool,
    status: EmergencyStatus,
}

pub async fn handle(ctx: &Context, args: ProximityArgs) -> Result<(), CliError> {
    let before = util::load_existing(ctx, &args.id).await?;

    let (distance_km, location) = match (args.distance, args.from, args.to) {
        (Some(km), _, _) => (km, None),
        (None, Some(crew), Some(incident)) => (haversine_km(crew, incident), Some(crew)),
        _ => {
            return Err(CliError::Validation {
                field: "distance".into(),
                reason: "pass --distance, or both --from and --to".into(),
            });
        }
    };

    let (advanced, status) = match ctx
        .engine
        .advance_for_distance(&args.id, distance_km, location)
        .await?
    {
        None => (false, before.status),
        Some(TransitionOutcome::Applied { snapshot, changed }) => (changed, snapshot.status),
        Some(TransitionOutcome::Rejected { from, to }) => {
            return Err(CliError::Rejected {
                from,
                to,
                allowed: util::allowed_list(from),
            });
        }
        Some(TransitionOutcome::Failed(e)) => return Err(e.into()),
    };

    let view = ProximityView {
        id: args.id,
        distance_km,
        threshold_km: ctx.engine.config().monitor.proximity_threshold_km,
        advanced,
        status,
    };
    let out = output::render_single(
        ctx.output,
        &view,
        |v| {
            let result = if v.advanced {
                format!("advanced to {}", output::paint_status(v.status, ctx.color))
            } else {
                format!("no change ({})", output::paint_status(v.status, ctx.color))
            };
            output::detail_block(&[
                ("ID", v.id.to_string()),
                ("Distance", format!("{:.3} km", v.distance_km)),
                ("Threshold", format!("{:.3} km", v.threshold_km)),
                ("Result", result),
            ])
        },
        |v| v.status.to_string(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
