//! `status`: one-shot state of the configured area.

use serde_json::json;

use inception_core::{BridgeConfig, SecuritySystem};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(bridge: BridgeConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let (area_id, state) = SecuritySystem::oneshot(bridge, |system| async move {
        let state = system.current_state().await?;
        Ok((system.area_id(), state))
    })
    .await?;

    let area = area_id.map(|id| id.to_string()).unwrap_or_default();
    let out = match global.output {
        OutputFormat::Table => format!(
            "area {area}: {}",
            output::paint_state(state, output::should_color())
        ),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "area_id": area,
            "state": state,
            "armed": state.is_armed(),
        }))?,
    };
    output::print_output(&out);
    Ok(())
}
