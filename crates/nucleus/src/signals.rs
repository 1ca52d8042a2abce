//! Signal handling for graceful shutdown.
//!
//! The first SIGINT or SIGTERM (Ctrl+C on Windows) starts a graceful shutdown;
//! the application arms a second listener that exits immediately.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal and logs it.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    wait_for_signal_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

/// Waits for a termination signal.
pub async fn wait_for_signal_silent() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
