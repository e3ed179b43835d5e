//! Signal handling and supervised shutdown

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Listen for Ctrl+C and (on Unix) SIGTERM; the receiver yields the name of the first signal
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<&'static str>> {
    let (signal_tx, signal_rx) = mpsc::channel(2);

    // Handle Ctrl+C (SIGINT)
    let ctrl_c_tx = signal_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C signal: {}", e);
            return;
        }

        info!("Ctrl+C signal received");
        let _ = ctrl_c_tx.send("SIGINT").await;
    });

    // Handle SIGTERM (Unix only)
    #[cfg(unix)]
    {
        use signal_hook::consts::SIGTERM;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(SIGTERM, shutdown_flag.clone())?;

        tokio::spawn(async move {
            // Poll for signal
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    info!("SIGTERM signal received");
                    let _ = signal_tx.send("SIGTERM").await;
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });
    }

    Ok(signal_rx)
}

/// Wait for a supervised component task, giving up after `limit`
pub async fn join_with_timeout<T>(name: &str, handle: JoinHandle<T>, limit: Duration) -> Option<T> {
    match timeout(limit, handle).await {
        Ok(Ok(value)) => {
            info!("{} stopped gracefully", name);
            Some(value)
        }
        Ok(Err(e)) => {
            error!("{} task failed: {}", name, e);
            None
        }
        Err(_) => {
            warn!("{} did not stop within {:?}, abandoning it", name, limit);
            None
        }
    }
}
