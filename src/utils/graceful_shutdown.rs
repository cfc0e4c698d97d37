use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use eyre::Result;
use tokio::{signal, sync::broadcast};

/// Why the server is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM, e.g. from an orchestrator scaling the replica down
    Terminate,
    /// Triggered programmatically
    Requested,
}

/// Fans a single shutdown signal out to every server loop
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    shutdown_initiated: Arc<AtomicBool>,
    /// Grace period granted to in-flight connections
    shutdown_timeout: Duration,
}

impl GracefulShutdown {
    /// Create a shutdown manager with the default 30-second grace period
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(shutdown_timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            shutdown_tx,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_timeout,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Start shutdown; later calls are ignored
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::info!("Shutdown initiated: {:?}", reason);
            // No receivers just means nothing is serving yet
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::warn!("Shutdown already initiated, ignoring {:?}", reason);
        }
    }

    /// Wait for SIGINT or SIGTERM and trigger shutdown
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started. Listening for SIGINT and SIGTERM");

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                self.trigger_shutdown(ShutdownReason::Interrupt);
            }
            result = wait_for_sigterm() => {
                result?;
                self.trigger_shutdown(ShutdownReason::Terminate);
            }
        }
        Ok(())
    }

    /// Token handed to a server loop
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            receiver: self.shutdown_tx.subscribe(),
            shutdown_initiated: self.shutdown_initiated.clone(),
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}

/// Per-listener view of the shutdown signal
pub struct ShutdownToken {
    receiver: broadcast::Receiver<ShutdownReason>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl Clone for ShutdownToken {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            shutdown_initiated: self.shutdown_initiated.clone(),
        }
    }
}

impl ShutdownToken {
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been triggered. Cancel-safe.
    pub async fn wait_for_shutdown(&mut self) -> ShutdownReason {
        if self.is_shutdown_initiated() {
            return self.receiver.try_recv().unwrap_or(ShutdownReason::Requested);
        }
        self.receiver
            .recv()
            .await
            .unwrap_or(ShutdownReason::Requested)
    }
}
