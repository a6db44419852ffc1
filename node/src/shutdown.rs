//! Graceful shutdown controller for the MVS node.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a shutdown signal to async
//! subsystems via a `tokio::sync::broadcast` channel. Blocking work such as
//! chain organization observes registered [`StopSignal`]s instead, which the
//! controller trips before broadcasting.

use std::sync::Mutex;

use tokio::signal;
use tokio::sync::broadcast;

use mvs_blockchain::StopSignal;

pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    signals: Mutex<Vec<StopSignal>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            signals: Mutex::new(Vec::new()),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trip `signal` when shutdown is triggered.
    pub fn register(&self, signal: StopSignal) {
        self.signals.lock().unwrap().push(signal);
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        for signal in self.signals.lock().unwrap().iter() {
            signal.stop();
        }
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> Result<(), std::io::Error> {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            term.recv().await;
            Ok::<(), std::io::Error>(())
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<Result<(), std::io::Error>>();

        tokio::select! {
            res = ctrl_c => {
                res?;
                tracing::info!("received SIGINT, shutting down");
            }
            res = terminate => {
                res?;
                tracing::info!("received SIGTERM, shutting down");
            }
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
