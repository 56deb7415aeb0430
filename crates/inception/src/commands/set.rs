//! `set`: dispatch one arming command.

use inception_core::{BridgeConfig, SecuritySystem, TargetState};

use crate::error::CliError;

pub async fn handle(bridge: BridgeConfig, target: TargetState) -> Result<(), CliError> {
    let area_id = SecuritySystem::oneshot(bridge, |system| async move {
        system.set_target_state(target).await?;
        Ok(system.area_id())
    })
    .await?;

    if let Some(area_id) = area_id {
        eprintln!("Area {area_id}: {target} requested");
    }
    Ok(())
}
