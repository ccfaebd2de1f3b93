//! Signal handling for graceful shutdown.

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Spawn listeners for SIGTERM and SIGINT.
///
/// The returned receiver yields once per signal.
pub fn setup_signal_handlers() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);

    // Handle SIGTERM
    let tx_term = tx.clone();
    tokio::spawn(async move {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM");
                let _ = tx_term.send(()).await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    });

    // Handle SIGINT (Ctrl+C)
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx.send(()).await;
        }
    });

    rx
}
