// ── Command dispatch ──
//
// Maps a requested target state onto the dialect's control token and
// issues exactly one panel command against the resolved area.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use inception_api::PanelClient;

use crate::error::CommandError;
use crate::model::{SemanticState, TargetState};
use crate::resolver::AreaRef;

pub struct CommandDispatcher {
    client: Arc<PanelClient>,
    area: Arc<AreaRef>,
    observed: watch::Receiver<Option<SemanticState>>,
}

impl CommandDispatcher {
    pub fn new(
        client: Arc<PanelClient>,
        area: Arc<AreaRef>,
        observed: watch::Receiver<Option<SemanticState>>,
    ) -> Self {
        Self {
            client,
            area,
            observed,
        }
    }

    /// Ask the panel to move the area to `target`.
    ///
    /// Returns once the panel has acknowledged the command; the resulting
    /// state change arrives through the synchronizer. A target equal to
    /// the last observed state is still sent.
    pub async fn set_state(&self, target: TargetState) -> Result<(), CommandError> {
        let area_id = self
            .area
            .resolved_id()
            .ok_or(CommandError::AreaUnresolved)?;

        let observed = *self.observed.borrow();
        if observed == Some(target.settled()) {
            info!(
                area_id = %area_id,
                target = %target,
                "target already matches observed state, sending anyway"
            );
        }

        let control = target.into();
        info!(
            area_id = %area_id,
            target = %target,
            token = self.client.dialect().control_token(control),
            observed = ?observed,
            "dispatching area command"
        );

        self.client.control_area(area_id, control).await?;
        info!(area_id = %area_id, target = %target, "panel accepted command");
        Ok(())
    }
}
