// ── SecuritySystem facade ──
//
// Lifecycle for one bridged area: authenticate, resolve the area, start
// the synchronizer and the command processor, expose state and commands
// to the accessory layer, and shut everything down cooperatively.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use inception_api::{AreaId, AreaSummary, PanelClient};

use crate::command::{CommandEnvelope, command_processor_task};
use crate::config::{BridgeConfig, SyncMode};
use crate::dispatch::CommandDispatcher;
use crate::error::{CommandError, CoreError};
use crate::model::{SemanticState, TargetState, decode_raw};
use crate::resolver::AreaRef;
use crate::sync::{StateSink, StateSynchronizer};

const COMMAND_CHANNEL_SIZE: usize = 16;

/// The accessory layer's handle on one panel area.
///
/// Cheaply cloneable via `Arc<SystemInner>`. Call
/// [`connect()`](Self::connect) before anything else.
#[derive(Clone)]
pub struct SecuritySystem {
    inner: Arc<SystemInner>,
}

struct SystemInner {
    config: BridgeConfig,
    client: Arc<PanelClient>,
    area: Arc<AreaRef>,
    sink: Arc<dyn StateSink>,
    state_tx: watch::Sender<Option<SemanticState>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SecuritySystem {
    /// Build the system from configuration. Does NOT connect.
    pub fn new(config: BridgeConfig, sink: Arc<dyn StateSink>) -> Result<Self, CoreError> {
        config.validate()?;

        let client = PanelClient::new(
            &config.base_url,
            config.dialect,
            config.auth.clone(),
            &config.transport(),
        )?;
        let area = Arc::new(AreaRef::new(config.area.clone()));
        let (state_tx, _) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(SystemInner {
                config,
                client: Arc::new(client),
                area,
                sink,
                state_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Authenticate, resolve the area, and start background tasks.
    ///
    /// Resolution failure is fatal: no task is started and the system
    /// stays unusable.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.start(true).await
    }

    async fn start(&self, synchronize: bool) -> Result<(), CoreError> {
        let inner = &self.inner;

        if let Err(e) = inner.client.session().authenticate().await {
            error!(error = %e, "panel login failed");
            return Err(inception_api::Error::from(e).into());
        }

        let area_id = match inner.area.resolve(&inner.client).await {
            Ok(id) => id,
            Err(e) => {
                error!(selector = %inner.area.selector(), error = %e, "area resolution failed");
                return Err(e.into());
            }
        };

        let Some(rx) = inner.command_rx.lock().await.take() else {
            debug!("already connected");
            return Ok(());
        };

        let mut handles = inner.task_handles.lock().await;
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&inner.client),
            Arc::clone(&inner.area),
            inner.state_tx.subscribe(),
        );
        handles.push(tokio::spawn(command_processor_task(
            dispatcher,
            rx,
            inner.cancel.clone(),
        )));

        if synchronize {
            let synchronizer = StateSynchronizer::new(
                Arc::clone(&inner.client),
                Arc::clone(&inner.area),
                inner.config.sync_mode,
                inner.config.poll_interval,
                inner.state_tx.clone(),
                inner.cancel.clone(),
            );
            handles.push(synchronizer.spawn(Arc::clone(&inner.sink)));
        }

        info!(area_id = %area_id, dialect = %inner.client.dialect(), "connected to panel");
        Ok(())
    }

    /// Stop background tasks.
    ///
    /// Tasks finish their in-flight request before stopping. A task still
    /// busy after one request timeout is aborted; in long-poll mode that
    /// timeout is the full long-poll wait plus grace.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        // An in-flight long-poll is allowed to finish so its update lands.
        let grace = match self.inner.config.sync_mode {
            SyncMode::LongPoll => self.inner.client.transport().long_poll_request_timeout(),
            SyncMode::Poll | SyncMode::Stream => self.inner.config.timeout,
        };
        let mut handles = self.inner.task_handles.lock().await;
        for mut handle in handles.drain(..) {
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!(grace_secs = grace.as_secs(), "background task still busy, aborting");
                handle.abort();
            }
        }
        debug!("security system shut down");
    }

    /// One-shot: connect without the synchronizer, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(config: BridgeConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(SecuritySystem) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let system = SecuritySystem::new(config, Arc::new(|_: SemanticState| {}))?;
        system.start(false).await?;
        let result = f(system.clone()).await;
        system.shutdown().await;
        result
    }

    // ── State ────────────────────────────────────────────────────

    /// The last observed state, or one on-demand fetch if none yet.
    ///
    /// An on-demand fetch is not published to subscribers.
    pub async fn current_state(&self) -> Result<SemanticState, CoreError> {
        if let Some(state) = *self.inner.state_tx.borrow() {
            return Ok(state);
        }

        let area_id = self
            .inner
            .area
            .resolved_id()
            .ok_or(CommandError::AreaUnresolved)?;
        let raw = self
            .inner
            .client
            .area_state(area_id)
            .await?
            .ok_or_else(|| CoreError::Api {
                message: format!("panel returned no state for area {area_id}"),
                status: None,
            })?;
        Ok(decode_raw(raw))
    }

    /// Watch semantic state changes. `None` until the first observation.
    pub fn subscribe(&self) -> watch::Receiver<Option<SemanticState>> {
        self.inner.state_tx.subscribe()
    }

    /// The resolved area ID, once known.
    pub fn area_id(&self) -> Option<AreaId> {
        self.inner.area.resolved_id().cloned()
    }

    /// Every area on the panel, in panel order.
    pub async fn areas(&self) -> Result<Vec<AreaSummary>, CoreError> {
        Ok(self.inner.client.list_areas().await?)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Request a state change.
    ///
    /// Queued behind any earlier request and executed exactly once.
    pub async fn set_target_state(&self, target: TargetState) -> Result<(), CommandError> {
        if self.inner.area.resolved_id().is_none() {
            return Err(CommandError::AreaUnresolved);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                target,
                response_tx: tx,
            })
            .await
            .map_err(|_| CommandError::Unavailable)?;

        rx.await.map_err(|_| CommandError::Unavailable)?
    }
}
