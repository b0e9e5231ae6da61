#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Daemon registry and control surface for buildwatch
//!
//! This crate wires the scheduling layer to the outside world: the
//! [`Daemon`] owns the project registry and the shared scheduler, runner,
//! and notifier; the HTTP control surface exposes `hello`, `add_project`,
//! and `shutdown`; and the notifier implementations render build results.

mod daemon;
mod http;
mod notify;

pub use daemon::Daemon;
pub use http::{build_router, AddProjectRequest};
pub use notify::{DesktopNotifier, LogNotifier};

// Re-export error types from core
pub use buildwatch_core::error::{Error, Result};

use buildwatch_core::{DaemonConfig, Notifier};
use buildwatch_runner::BuildRunner;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the daemon in the foreground until shutdown.
///
/// This is the crate's entry point. It:
/// 1. Builds the daemon (scheduler, event source, registry)
/// 2. Binds the control surface to the configured address
/// 3. Serves control calls until a `shutdown` call or Ctrl-C
/// 4. Tears down the event source and scheduler, waiting for both
pub async fn run_server(
    config: DaemonConfig,
    runner: Arc<dyn BuildRunner>,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let daemon = Arc::new(Daemon::new(runner, notifier)?);
    let shutdown = CancellationToken::new();
    let router = build_router(Arc::clone(&daemon), shutdown.clone());

    let endpoint = config.endpoint();
    let listener = tokio::net::TcpListener::bind(&endpoint)
        .await
        .map_err(|e| Error::config(format!("Failed to bind {endpoint}: {e}")))?;
    info!("Control surface listening on {endpoint}");

    let signal = {
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C");
                }
            }
        }
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| Error::watcher(format!("Control surface failed: {e}")))?;

    // The listener is closed; no further control calls can arrive.
    daemon.shutdown().await;
    Ok(())
}
