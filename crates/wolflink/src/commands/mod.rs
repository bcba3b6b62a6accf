//! Command dispatch: bridges CLI args -> portal calls -> output formatting.

pub mod config_cmd;
pub mod parameters;
pub mod status;
pub mod systems;
pub mod util;
pub mod values;
pub mod watch;

use wolflink_api::PortalClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a portal-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &PortalClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Systems => systems::handle(client, global).await,
        Command::Status(args) => status::handle(client, args, global).await,
        Command::Parameters(args) => parameters::handle(client, args, global).await,
        Command::Values(args) => values::handle(client, args, global).await,
        Command::Watch(args) => watch::handle(client, args, global).await,
        // Config and Completions never reach a portal client
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
