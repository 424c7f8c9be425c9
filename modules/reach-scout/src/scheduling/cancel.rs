use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

/// Cooperative stop flag shared by the signal handler and the discovery loop.
///
/// Cancelling never interrupts a call in flight; the engine checks the flag
/// before each new remote call and winds down from there.
#[derive(Debug, Clone, Default)]
pub struct CancellationController {
    cancelled: Arc<AtomicBool>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Spawn a task that cancels on Ctrl+C (and SIGTERM on unix).
    pub fn listen_for_shutdown(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            wait_for_shutdown().await;
            info!("Shutdown requested, finishing current work and saving results");
            controller.cancel();
        })
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "Could not install SIGTERM handler, listening for Ctrl+C only");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl+C handler failed");
            }
            return;
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Ctrl+C handler failed");
            }
        }
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C handler failed");
    }
}
