//! Termination and manual-reindex handling.
//!
//! OS signals are turned into [`LifecycleSignal`]s on two independent
//! channels. The [`SignalCoordinator`] consumes them: a termination request
//! drives the ordered shutdown, a reindex request refreshes the library
//! without touching lifecycle state.

use std::sync::{Arc, Mutex};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    library::Library,
    liveness::Heartbeat,
    supervisor::{Notification, Supervisor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    Terminate,
    ReindexRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    ShuttingDown,
}

/// Receiving side of the lifecycle channels.
#[derive(Debug)]
pub struct Signals {
    pub terminate: mpsc::Receiver<()>,
    pub reindex: mpsc::Receiver<()>,
}

/// Sending side of the lifecycle channels.
#[derive(Debug, Clone)]
pub struct SignalSender {
    terminate: mpsc::Sender<()>,
    reindex: mpsc::Sender<()>,
}

impl SignalSender {
    /// Requests that arrive while one of the same kind is still queued are
    /// folded into it.
    pub fn send(&self, signal: LifecycleSignal) {
        let tx = match signal {
            LifecycleSignal::Terminate => &self.terminate,
            LifecycleSignal::ReindexRequested => &self.reindex,
        };
        let _ = tx.try_send(());
    }
}

impl Signals {
    pub fn channel() -> (SignalSender, Self) {
        let (terminate_tx, terminate) = mpsc::channel(1);
        let (reindex_tx, reindex) = mpsc::channel(1);
        let sender = SignalSender {
            terminate: terminate_tx,
            reindex: reindex_tx,
        };
        (sender, Self { terminate, reindex })
    }

    /// Forward SIGINT and SIGTERM as `Terminate` and SIGUSR1 as
    /// `ReindexRequested`. Must be called inside the runtime.
    #[cfg(unix)]
    pub fn from_os() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let (sender, signals) = Self::channel();
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut user1 = signal(SignalKind::user_defined1())?;

        let tx = sender.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(()) = interrupt.recv() => {}
                    Some(()) = terminate.recv() => {}
                    else => break,
                }
                tx.send(LifecycleSignal::Terminate);
            }
        });
        tokio::spawn(async move {
            while user1.recv().await.is_some() {
                sender.send(LifecycleSignal::ReindexRequested);
            }
        });

        Ok(signals)
    }

    /// Ctrl-C is the only signal available here; there is no reindex
    /// trigger.
    #[cfg(not(unix))]
    pub fn from_os() -> Result<Self> {
        let (sender, signals) = Self::channel();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                sender.send(LifecycleSignal::Terminate);
            }
        });
        Ok(signals)
    }
}

type Cleanup = Box<dyn FnOnce() + Send>;

/// Passed to every concurrent unit at spawn time: a cancellation token that
/// marks the start of shutdown, and a cleanup action that runs at most once.
#[derive(Clone)]
pub struct ShutdownContext {
    token: CancellationToken,
    cleanup: Arc<Mutex<Option<Cleanup>>>,
}

impl ShutdownContext {
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            token: CancellationToken::new(),
            cleanup: Arc::new(Mutex::new(Some(Box::new(cleanup)))),
        }
    }

    /// A token cancelled when shutdown begins, for a unit that must stop.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancel(&self) {
        self.token.cancel();
    }

    fn run_cleanup(&self) {
        let cleanup = self
            .cleanup
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

impl std::fmt::Debug for ShutdownContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownContext")
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

pub struct SignalCoordinator {
    supervisor: Arc<dyn Supervisor>,
    context: ShutdownContext,
}

impl SignalCoordinator {
    pub fn new(supervisor: Arc<dyn Supervisor>, context: ShutdownContext) -> Self {
        Self {
            supervisor,
            context,
        }
    }

    pub fn state(&self) -> Lifecycle {
        if self.context.is_shutting_down() {
            Lifecycle::ShuttingDown
        } else {
            Lifecycle::Running
        }
    }

    /// Refresh the library on every reindex request until shutdown begins.
    ///
    /// A refresh still running when shutdown starts is abandoned, not
    /// awaited.
    pub fn spawn_reindex_listener(
        &self,
        mut requests: mpsc::Receiver<()>,
        library: Arc<Library>,
    ) -> JoinHandle<()> {
        let stop = self.context.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    request = requests.recv() => {
                        if request.is_none() {
                            break;
                        }
                    }
                }

                tracing::info!("Booklist refresh triggered by SIGUSR1");
                let library = Arc::clone(&library);
                let refresh =
                    tokio::task::spawn_blocking(move || library.refresh_full());
                tokio::select! {
                    _ = stop.cancelled() => break,
                    outcome = refresh => match outcome {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::warn!("book refresh failed: {e}"),
                        Err(e) => tracing::warn!("book refresh task failed: {e}"),
                    },
                }
            }
            tracing::debug!("reindex listener stopped");
        })
    }

    /// `Running -> ShuttingDown`. Reports the signal, stops the heartbeat
    /// (which sends `Stopping` once its loop has exited) and runs the
    /// cleanup action. In-flight work is not awaited.
    pub async fn shutdown(&self, heartbeat: Heartbeat) {
        tracing::info!("shutting down");
        self.supervisor.notify(&Notification::status("Caught signal"));
        self.context.cancel();
        heartbeat.stop().await;
        self.context.run_cleanup();
    }
}
