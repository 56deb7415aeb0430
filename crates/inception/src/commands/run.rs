//! `run`: keep the area in sync until Ctrl-C.

use std::sync::Arc;

use chrono::Local;
use serde_json::json;

use inception_core::{BridgeConfig, SecuritySystem, SemanticState, StateSink};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(bridge: BridgeConfig, name: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let sink = change_printer(name.to_owned(), global.output);
    let system = SecuritySystem::new(bridge, sink)?;
    system.connect().await?;

    if let Some(area_id) = system.area_id() {
        eprintln!(
            "{name}: watching area {area_id} ({} mode), Ctrl-C to stop",
            system.config().sync_mode
        );
    }

    let waited = tokio::signal::ctrl_c().await;
    system.shutdown().await;
    waited?;
    Ok(())
}

/// One line per state change, stamped with local time.
fn change_printer(name: String, format: OutputFormat) -> Arc<dyn StateSink> {
    let color = output::should_color();
    Arc::new(move |state: SemanticState| {
        let now = Local::now();
        let line = match format {
            OutputFormat::Table => format!(
                "{}  {name}  {}",
                now.format("%Y-%m-%d %H:%M:%S"),
                output::paint_state(state, color)
            ),
            OutputFormat::Json => json!({
                "time": now.to_rfc3339(),
                "name": name,
                "state": state,
            })
            .to_string(),
        };
        output::print_output(&line);
    })
}
