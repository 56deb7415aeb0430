// ── State synchronizer ──
//
// One long-lived task per area: fetch, decode, publish if changed, then
// schedule exactly one next cycle. Errors are logged and absorbed; only
// cancellation ends the loop, and it is only observed between cycles or
// while idle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use inception_api::{AreaId, PanelClient, RawAreaState, UpdateBatch, UpdateStream};

use crate::config::SyncMode;
use crate::model::{AreaStateFlags, SemanticState, decode_raw};
use crate::resolver::AreaRef;

// ── StateSink ────────────────────────────────────────────────────────

/// Receives every semantic state change of the watched area.
pub trait StateSink: Send + Sync {
    fn on_state_change(&self, state: SemanticState);
}

impl<F> StateSink for F
where
    F: Fn(SemanticState) + Send + Sync,
{
    fn on_state_change(&self, state: SemanticState) {
        self(state);
    }
}

// ── Cycle scheduling ─────────────────────────────────────────────────

/// What one fetch cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A state arrived and differs from the last published one.
    Changed,
    /// A state arrived and equals the last published one.
    Unchanged,
    /// The panel answered with nothing for this area.
    Empty,
    /// The panel answered with a body that could not be used.
    Malformed,
    /// The request failed (network, auth, server error).
    Failed,
    /// The area ID is not known yet; nothing was fetched.
    Unresolved,
}

/// Delay before the next cycle.
///
/// Polling always waits the interval. Long-poll and stream re-issue at
/// once after a good cycle, because the panel itself does the waiting,
/// and back off by one interval after anything went wrong.
pub fn next_delay(mode: SyncMode, outcome: CycleOutcome, interval: Duration) -> Duration {
    match (mode, outcome) {
        (_, CycleOutcome::Malformed | CycleOutcome::Failed | CycleOutcome::Unresolved)
        | (SyncMode::Poll, _) => interval,
        (
            SyncMode::LongPoll | SyncMode::Stream,
            CycleOutcome::Changed | CycleOutcome::Unchanged | CycleOutcome::Empty,
        ) => Duration::ZERO,
    }
}

// ── StateSynchronizer ────────────────────────────────────────────────

/// The polling / long-poll / stream loop for one area.
///
/// Consumed by [`spawn`](Self::spawn), so at most one cycle per area is
/// ever in flight.
pub struct StateSynchronizer {
    client: Arc<PanelClient>,
    area: Arc<AreaRef>,
    mode: SyncMode,
    interval: Duration,
    state_tx: watch::Sender<Option<SemanticState>>,
    cancel: CancellationToken,
    cursor: u64,
    stream: Option<UpdateStream>,
}

impl StateSynchronizer {
    pub fn new(
        client: Arc<PanelClient>,
        area: Arc<AreaRef>,
        mode: SyncMode,
        interval: Duration,
        state_tx: watch::Sender<Option<SemanticState>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            area,
            mode,
            interval,
            state_tx,
            cancel,
            cursor: 0,
            stream: None,
        }
    }

    /// Start the loop. It runs until the cancellation token fires.
    pub fn spawn(self, sink: Arc<dyn StateSink>) -> JoinHandle<()> {
        tokio::spawn(self.run(sink))
    }

    async fn run(mut self, sink: Arc<dyn StateSink>) {
        info!(mode = %self.mode, interval_ms = millis(self.interval), "state synchronizer started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let outcome = self.cycle(sink.as_ref()).await;
            let delay = next_delay(self.mode, outcome, self.interval);
            debug!(?outcome, delay_ms = millis(delay), "sync cycle complete");

            if delay.is_zero() {
                continue;
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(stream) = self.stream.take() {
            stream.close().await;
        }
        debug!("state synchronizer stopped");
    }

    /// One fetch/decode/publish unit.
    async fn cycle(&mut self, sink: &dyn StateSink) -> CycleOutcome {
        let Some(area_id) = self.area.resolved_id().cloned() else {
            debug!(selector = %self.area.selector(), "area not resolved, skipping cycle");
            return CycleOutcome::Unresolved;
        };

        let fetched = match self.mode {
            SyncMode::Poll => self.client.area_state(&area_id).await,
            SyncMode::LongPoll => self.long_poll(&area_id).await,
            SyncMode::Stream => self.stream_batch(&area_id).await,
        };

        match fetched {
            Ok(Some(raw)) => self.publish(&area_id, raw, sink),
            Ok(None) => CycleOutcome::Empty,
            Err(e) if e.is_protocol() => {
                warn!(area_id = %area_id, error = %e, "ignoring malformed panel response");
                CycleOutcome::Malformed
            }
            Err(e) => {
                warn!(area_id = %area_id, error = %e, "area state fetch failed");
                CycleOutcome::Failed
            }
        }
    }

    async fn long_poll(
        &mut self,
        area_id: &AreaId,
    ) -> Result<Option<RawAreaState>, inception_api::Error> {
        match self.client.monitor_area_updates(self.cursor).await {
            Ok(Some(batch)) => Ok(self.take_batch(area_id, &batch)),
            Ok(None) => Ok(None),
            Err(e) => {
                self.cursor = 0;
                Err(e)
            }
        }
    }

    async fn stream_batch(
        &mut self,
        area_id: &AreaId,
    ) -> Result<Option<RawAreaState>, inception_api::Error> {
        if self.stream.is_none() {
            match self.client.open_update_stream(self.cursor).await {
                Ok(stream) => self.stream = Some(stream),
                Err(e) => {
                    self.cursor = 0;
                    return Err(e);
                }
            }
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let received = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Ok(None),
            received = stream.next_batch() => received,
        };

        match received {
            Ok(Some(batch)) => Ok(self.take_batch(area_id, &batch)),
            Ok(None) => Ok(None),
            Err(e) => {
                self.stream = None;
                self.cursor = 0;
                Err(e)
            }
        }
    }

    /// Advance the cursor and pick this area's latest state from a batch.
    fn take_batch(&mut self, area_id: &AreaId, batch: &UpdateBatch) -> Option<RawAreaState> {
        if let Some(update_time) = batch.update_time {
            self.cursor = update_time;
        }
        batch.latest_for(area_id).and_then(|u| u.state.raw())
    }

    fn publish(&self, area_id: &AreaId, raw: RawAreaState, sink: &dyn StateSink) -> CycleOutcome {
        if let RawAreaState::Bitmask(mask) = raw {
            let flags = AreaStateFlags::from_bits_retain(mask);
            debug!(
                area_id = %area_id,
                mask,
                auxiliary = ?flags.auxiliary().names(),
                "decoded area status word"
            );
        }

        let state = decode_raw(raw);
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == Some(state) {
                false
            } else {
                *current = Some(state);
                true
            }
        });

        if changed {
            info!(area_id = %area_id, state = %state, "area state changed");
            sink.on_state_change(state);
            CycleOutcome::Changed
        } else {
            CycleOutcome::Unchanged
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
