//! Graceful shutdown token driven by SIGINT/SIGTERM

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Cloneable shutdown flag with an interruptible wait
///
/// Set at most once; later triggers change nothing.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown; returns true only for the first request
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until shutdown is requested
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Wait up to `timeout` for shutdown; returns whether it was requested
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        let _ = tokio::time::timeout(timeout, self.wait()).await;
        self.is_triggered()
    }

    fn on_signal(&self, name: &str) {
        if self.trigger() {
            info!(signal = name, "shutdown requested");
        } else {
            debug!(signal = name, "shutdown already requested");
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger `shutdown` on SIGINT or SIGTERM
///
/// Handlers are installed before this returns; the listener keeps running
/// so repeated signals are absorbed.
#[cfg(unix)]
pub fn listen_for_signals(shutdown: ShutdownSignal) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                else => break,
            };
            shutdown.on_signal(name);
        }
    }))
}

#[cfg(not(unix))]
pub fn listen_for_signals(shutdown: ShutdownSignal) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            shutdown.on_signal("ctrl-c");
        }
    }))
}
