// ── Command channel ──
//
// State change requests from the accessory layer are queued on an mpsc
// channel and executed one at a time by a single processor task.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dispatch::CommandDispatcher;
use crate::error::CommandError;
use crate::model::TargetState;

/// A request sent through the command channel, with its reply slot.
pub(crate) struct CommandEnvelope {
    pub target: TargetState,
    pub response_tx: oneshot::Sender<Result<(), CommandError>>,
}

/// Execute queued commands in arrival order until cancelled or every
/// sender is gone.
pub(crate) async fn command_processor_task(
    dispatcher: CommandDispatcher,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = dispatcher.set_state(envelope.target).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
    debug!("command processor stopped");
}
