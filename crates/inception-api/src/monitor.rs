// Long-poll update monitor
//
// The panel holds a `monitor-updates` request open until area state changes
// or its own timeout elapses. The cursor (`timeSinceUpdate`) is the
// `updateTime` of the previous answer, so only newer changes come back.

use tracing::debug;

use crate::client::PanelClient;
use crate::error::Error;
use crate::models::{MonitorRequest, MonitorResponse, UpdateBatch};

impl PanelClient {
    /// Wait for area state updates newer than `cursor`.
    ///
    /// Returns `Ok(None)` when the panel answered without a body, which it
    /// does when its wait elapsed with nothing to report. A cursor of `0`
    /// asks for the current state of every area.
    pub async fn monitor_area_updates(&self, cursor: u64) -> Result<Option<UpdateBatch>, Error> {
        let path = self
            .dialect()
            .monitor_path()
            .ok_or(Error::Unsupported("long-poll monitoring"))?;
        let url = self.url(path)?;
        let request = MonitorRequest::area_state(cursor);
        let timeout = self.transport().long_poll_request_timeout();

        debug!(cursor, timeout_secs = timeout.as_secs(), "POST {}", url);

        let resp = self
            .send(|http| http.post(url.clone()).timeout(timeout).json(&request))
            .await?;

        let Some(body) = Self::read_body(resp).await? else {
            return Ok(None);
        };
        let envelope: MonitorResponse = Self::parse(&body)?;
        Ok(Some(envelope.result))
    }
}
