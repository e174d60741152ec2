pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod heartbeat;
pub mod monitor;
pub mod notify;
pub mod schedule;
pub mod search;
pub mod supervisor;
pub mod types;
pub mod watchdog;

#[cfg(test)]
mod testing;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancel `token` on SIGINT or SIGTERM.
pub fn cancel_on_shutdown_signal(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let Ok(mut term) = signal(SignalKind::terminate()) else {
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT, shutting down...");
                token.cancel();
                return;
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
                _ = term.recv() => info!("Received SIGTERM, shutting down..."),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received SIGINT, shutting down...");
        }
        token.cancel();
    });
}
