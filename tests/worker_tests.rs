// Worker integration test: spawn the watch loop, let a GPU tick rewrite the
// export, shutdown cleanly

use std::sync::Arc;
use std::time::Duration;

use hwsnap::aggregator::Aggregator;
use hwsnap::config::SpdConfig;
use hwsnap::models::SystemSnapshot;
use hwsnap::worker::{WorkerConfig, WorkerDeps, spawn};

#[tokio::test]
async fn worker_refreshes_exports_and_shuts_down() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("snapshot.json");

    let aggregator = Arc::new(Aggregator::new(SpdConfig::default()));
    aggregator.gather().await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn(
        WorkerDeps {
            aggregator: aggregator.clone(),
            shutdown_rx,
        },
        WorkerConfig {
            interval_secs: 3600,
            gpu_interval_secs: 1,
            json_path: Some(json_path.clone()),
            report_path: None,
        },
    );

    // The GPU tick lands after about a second and rewrites the export.
    let written = tokio::time::timeout(Duration::from_secs(30), async {
        while !json_path.is_file() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;
    assert!(written.is_ok(), "export file never appeared");

    // Writes go through a temp file and rename, so this read can never
    // observe a half-written export.
    let text = std::fs::read_to_string(&json_path).unwrap();
    let snapshot: SystemSnapshot = serde_json::from_str(&text).unwrap();
    assert!(snapshot.memory.total > 0);

    let _ = shutdown_tx.send(());
    handle.await.unwrap();
}
