//! machinewatch -- simulated machine-health monitor.
//!
//! This crate provides an anomaly-injecting sensor simulator, a rule-based
//! failure risk scorer, threshold alerting, and a periodic scheduler that
//! publishes the latest snapshot to in-process and HTTP consumers.

pub mod api;
pub mod config;
pub mod detect;
pub mod scheduler;
pub mod sensor;

use anyhow::{Context, Result};

use crate::config::MonitorConfig;
use crate::scheduler::{Monitor, TickScheduler};

/// Start the monitor daemon: tick scheduler and read-only API server.
/// Runs until Ctrl-C.
pub async fn serve(config: MonitorConfig, bind: &str) -> Result<()> {
    // 1. Start the tick scheduler (background task)
    let monitor = Monitor::from_config(&config);
    let scheduler = TickScheduler::start(monitor, config.scheduler.tick_interval());
    tracing::info!(
        machine = %config.machine.udi,
        tick_ms = config.scheduler.tick_interval_ms,
        "Monitor started"
    );

    // 2. Start API server
    let addr: std::net::SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {bind}"))?;
    let app = api::router(api::state::AppState {
        view: scheduler.view(),
    });

    tracing::info!(%addr, "machinewatch listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    // 3. Tear down the scheduler
    scheduler.stop().await;
    Ok(())
}

/// Resolves once `signal` reports a shutdown request. If the signal source
/// fails the error is logged and this never resolves, so the server keeps
/// running instead of shutting down on the spot.
async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
