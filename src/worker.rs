// Background watch loop: coarse full gathers plus a lighter GPU-only
// refresh on its own shorter tick. Export files, when configured, are
// rewritten after every published snapshot so they always hold the
// current state.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::{Duration, Instant, interval_at};
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::export::{self, ExportError};
use crate::models::SystemSnapshot;

/// Aggregator handle plus shutdown for the watch loop.
pub struct WorkerDeps {
    pub aggregator: Arc<Aggregator>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Watch loop timing and export targets.
pub struct WorkerConfig {
    pub interval_secs: u64,
    pub gpu_interval_secs: u64,
    pub json_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        aggregator,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        interval_secs,
        gpu_interval_secs,
        json_path,
        report_path,
    } = config;

    tokio::spawn(async move {
        // First ticks land one period out; the caller has already done the
        // initial gather before spawning.
        let full_period = Duration::from_secs(interval_secs);
        let mut full_tick = interval_at(Instant::now() + full_period, full_period);
        full_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let gpu_period = Duration::from_secs(gpu_interval_secs);
        let mut gpu_tick = interval_at(Instant::now() + gpu_period, gpu_period);
        gpu_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", interval_secs);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                _ = full_tick.tick() => {
                    let snapshot = aggregator.gather().await;
                    info!(
                        operation = "gather",
                        gpus = snapshot.gpus.len(),
                        interfaces = snapshot.network.len(),
                        "snapshot refreshed"
                    );
                    write_exports(snapshot, json_path.clone(), report_path.clone()).await;
                }
                _ = gpu_tick.tick() => {
                    match aggregator.refresh_gpus().await {
                        Some(snapshot) => {
                            debug!(operation = "refresh_gpus", gpus = snapshot.gpus.len(), "gpu section refreshed");
                            write_exports(snapshot, json_path.clone(), report_path.clone()).await;
                        }
                        None => debug!("gpu refresh skipped; nothing gathered yet"),
                    }
                }
                _ = &mut shutdown_rx => {
                    debug!("worker shutting down");
                    break;
                }
            }
        }
    })
}

async fn write_exports(
    snapshot: Arc<SystemSnapshot>,
    json_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) {
    if json_path.is_none() && report_path.is_none() {
        return;
    }
    let result = tokio::task::spawn_blocking(move || -> Result<(), ExportError> {
        if let Some(path) = json_path {
            export::save_json(&snapshot, &path)?;
        }
        if let Some(path) = report_path {
            export::save_report(&snapshot, &path)?;
        }
        Ok(())
    })
    .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "export failed"),
        Err(e) => warn!(error = %e, "export task join failed"),
    }
}
