//! `areas`: list the panel's areas, marking the configured one if set.

use std::sync::Arc;

use tabled::Tabled;

use inception_core::{
    AreaSelector, AreaSummary, BridgeConfig, SecuritySystem, SemanticState, decode_raw,
    select_area,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AreaRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    bridge: BridgeConfig,
    selector: Option<AreaSelector>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let system = SecuritySystem::new(bridge, Arc::new(|_: SemanticState| {}))?;
    let areas = system.areas().await?;

    let configured = selector
        .as_ref()
        .and_then(|s| select_area(&areas, s).ok())
        .map(|a| a.id.clone());

    let out = output::render_list(global.output, &areas, |index, area: &AreaSummary| {
        AreaRow {
            marker: if configured.as_ref() == Some(&area.id) {
                "*"
            } else {
                ""
            },
            index,
            id: area.id.to_string(),
            name: area.name.clone(),
            state: area
                .state
                .raw()
                .map(|raw| decode_raw(raw).to_string())
                .unwrap_or_default(),
        }
    })?;
    output::print_output(&out);

    if let (Some(selector), None) = (&selector, &configured) {
        eprintln!("Configured area {selector} is not on this panel");
    }
    Ok(())
}
