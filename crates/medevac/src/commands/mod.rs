//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod allowed;
pub mod config_cmd;
pub mod emergency;
pub mod proximity;
pub mod transition;
pub mod util;
pub mod watch;

use crate::cli::Command;
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a storage-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Load(args) => emergency::load(ctx, args).await,
        Command::Status(args) => emergency::status(ctx, args).await,
        Command::History(args) => emergency::history(ctx, args).await,
        Command::Elapsed(args) => emergency::elapsed(ctx, args).await,
        Command::Transition(args) => transition::handle(ctx, args).await,
        Command::Allowed(args) => allowed::handle(ctx, &args),
        Command::Proximity(args) => proximity::handle(ctx, args).await,
        Command::Watch(args) => watch::handle(ctx, args).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
