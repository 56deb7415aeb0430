//! Command dispatch: CLI args -> `SecuritySystem` calls -> output.

pub mod areas;
pub mod run;
pub mod set;
pub mod status;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    tracing::debug!(command = ?cmd, "dispatching command");

    match cmd {
        Command::Run => {
            let (cfg, bridge) = config::resolve(global)?;
            run::handle(bridge, &cfg.name, global).await
        }
        Command::Status => status::handle(config::resolve(global)?.1, global).await,
        Command::Set { target } => set::handle(config::resolve(global)?.1, target.into()).await,
        // Listing works before an area has been chosen.
        Command::Areas => {
            let (bridge, selector) = config::resolve_for_listing(global)?;
            areas::handle(bridge, selector, global).await
        }
    }
}
