//! Download runtime command router.
//!
//! A thin async command queue that runs download requests off the caller's
//! thread. Each submitted request executes on its own task; presentation
//! updates flow back through the shared [`EventEmitter`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::core::models::{AppError, AppResult, DownloadOutcome, DownloadRequest};
use crate::core::orchestrator::BatchOrchestrator;
use crate::core::resolver::MediaResolver;
use crate::ui::events::EventEmitter;

/// Commands understood by the runtime router.
#[derive(Debug)]
pub enum RuntimeCommand {
    Submit {
        request: DownloadRequest,
        respond_to: oneshot::Sender<Vec<DownloadOutcome>>,
    },
    /// Responds with the number of runs that were in flight
    Cancel {
        respond_to: oneshot::Sender<usize>,
    },
}

/// Handle exposed to the front end.
#[derive(Clone)]
pub struct DownloadRuntimeHandle {
    sender: mpsc::Sender<RuntimeCommand>,
}

impl DownloadRuntimeHandle {
    pub fn new(sender: mpsc::Sender<RuntimeCommand>) -> Self {
        Self { sender }
    }

    async fn send_command<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RuntimeCommand,
    ) -> AppResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| AppError::System(format!("Download runtime unavailable: {}", e)))?;
        rx.await
            .map_err(|_| AppError::System("Download runtime dropped response".into()))
    }

    /// Run a request to completion and return one outcome per attempted item
    pub async fn submit(&self, request: DownloadRequest) -> AppResult<Vec<DownloadOutcome>> {
        self.send_command(|tx| RuntimeCommand::Submit {
            request,
            respond_to: tx,
        })
        .await
    }

    /// Cancel every run currently in flight
    pub async fn cancel_all(&self) -> AppResult<usize> {
        self.send_command(|tx| RuntimeCommand::Cancel { respond_to: tx })
            .await
    }
}

/// Spawn the router loop and return its handle.
///
/// Uses the current tokio runtime when there is one, otherwise a dedicated
/// thread with its own runtime.
pub fn spawn_download_runtime<R>(resolver: Arc<R>, events: EventEmitter) -> AppResult<DownloadRuntimeHandle>
where
    R: MediaResolver + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    let router_future = router_loop(resolver, events, rx);

    match Handle::try_current() {
        Ok(handle) => {
            info!("[RUNTIME] Spawning router in existing tokio runtime");
            handle.spawn(router_future);
        }
        Err(_) => {
            warn!("[RUNTIME] No tokio runtime found, creating dedicated thread with new runtime");
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("download-runtime-worker")
                .build()?;
            std::thread::Builder::new()
                .name("download-runtime".into())
                .spawn(move || runtime.block_on(router_future))
                .map_err(|e| AppError::System(format!("Failed to spawn download runtime: {}", e)))?;
        }
    }

    Ok(DownloadRuntimeHandle::new(tx))
}

async fn router_loop<R>(
    resolver: Arc<R>,
    events: EventEmitter,
    mut rx: mpsc::Receiver<RuntimeCommand>,
) where
    R: MediaResolver + ?Sized + 'static,
{
    let mut cancel = CancellationToken::new();
    let active = Arc::new(AtomicUsize::new(0));

    while let Some(cmd) = rx.recv().await {
        debug!("[RUNTIME] Processing command: {:?}", cmd);
        handle_command(&resolver, &events, &mut cancel, &active, cmd);
    }
    cancel.cancel();
    debug!("Download runtime channel closed, exiting router loop");
}

#[instrument(skip_all)]
fn handle_command<R>(
    resolver: &Arc<R>,
    events: &EventEmitter,
    cancel: &mut CancellationToken,
    active: &Arc<AtomicUsize>,
    command: RuntimeCommand,
) where
    R: MediaResolver + ?Sized + 'static,
{
    match command {
        RuntimeCommand::Submit {
            request,
            respond_to,
        } => {
            let orchestrator = BatchOrchestrator::new(Arc::clone(resolver), events.clone())
                .with_cancellation(cancel.child_token());
            let active = Arc::clone(active);
            active.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let outcomes = orchestrator.run(&request).await;
                active.fetch_sub(1, Ordering::SeqCst);
                debug!(
                    "[RUNTIME_CMD] Run for {} finished with {} outcomes",
                    request.locator,
                    outcomes.len()
                );
                let _ = respond_to.send(outcomes);
            });
        }
        RuntimeCommand::Cancel { respond_to } => {
            let in_flight = active.load(Ordering::SeqCst);
            info!("[RUNTIME_CMD] Cancelling {} active runs", in_flight);
            cancel.cancel();
            // later submissions get a fresh parent token
            *cancel = CancellationToken::new();
            let _ = respond_to.send(in_flight);
        }
    }
}
