//! `medevac transition` handler.

use medevac_core::TransitionOutcome;

use crate::cli::TransitionArgs;
use crate::config::Context;
use crate::error::CliError;

use super::util;

pub async fn handle(ctx: &Context, args: TransitionArgs) -> Result<(), CliError> {
    util::load_existing(ctx, &args.id).await?;

    let location = args.location();
    let outcome = ctx
        .engine
        .attempt_transition(&args.id, args.status, location, args.notes)
        .await?;

    match outcome {
        TransitionOutcome::Applied { snapshot, changed } => {
            if !changed && !ctx.quiet {
                eprintln!("{} is already {}", snapshot.id, snapshot.status);
            }
            util::print_status(ctx, &snapshot)
        }
        TransitionOutcome::Rejected { from, to } => Err(CliError::Rejected {
            from,
            to,
            allowed: util::allowed_list(from),
        }),
        TransitionOutcome::Failed(e) => Err(e.into()),
    }
}
