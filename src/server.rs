use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::monitor::{self, Monitor};

pub fn router(monitor: Arc<Monitor>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/check", get(check))
        .with_state(monitor)
}

async fn health(State(monitor): State<Arc<Monitor>>) -> String {
    format!(
        "profile-watch is running ({} account(s))",
        monitor.account_count()
    )
}

/// Same entry point as the scheduled job; waits for the cycle to finish.
/// The cycle runs on its own task so a client hanging up mid-cycle does not
/// cut it short.
async fn check(State(monitor): State<Arc<Monitor>>) -> String {
    info!("Check cycle requested over HTTP");
    let cycle = tokio::spawn(async move { monitor.run_check_cycle().await });
    match cycle.await {
        Ok(reports) => monitor::summarize(&reports),
        Err(e) => {
            error!("Check cycle task failed: {}", e);
            format!("Check cycle failed: {}", e)
        }
    }
}

pub async fn serve(bind: &str, monitor: Arc<Monitor>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("HTTP server listening on {}", bind);

    axum::serve(listener, router(monitor))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}
