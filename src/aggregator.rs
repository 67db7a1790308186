// Snapshot assembly: run every collector, merge one immutable snapshot,
// publish it by whole-object replacement.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local};
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::collectors::{
    BoardCollector, CpuCollector, GpuCollector, MemoryCollector, NetworkCollector, OsCollector,
};
use crate::config::SpdConfig;
use crate::models::{CpuFacts, MemoryFacts, OsFacts, SystemSnapshot};
use crate::platform;

/// Latest published snapshot. Each gather builds a complete new value and
/// swaps the `Arc` in one write; readers never see a half-updated snapshot.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<SystemSnapshot>>>,
}

impl SnapshotStore {
    pub async fn current(&self) -> Option<Arc<SystemSnapshot>> {
        self.current.read().await.clone()
    }

    async fn publish(&self, snapshot: SystemSnapshot) -> Arc<SystemSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot.clone());
        snapshot
    }
}

pub struct Aggregator {
    os: OsCollector,
    cpu: CpuCollector,
    memory: MemoryCollector,
    board: BoardCollector,
    gpu: GpuCollector,
    network: NetworkCollector,
    store: SnapshotStore,
    last_stamp_micros: AtomicI64,
}

impl Aggregator {
    pub fn new(spd: SpdConfig) -> Self {
        Self {
            os: OsCollector::new(),
            cpu: CpuCollector::new(platform::cpu_ext()),
            memory: MemoryCollector::new(platform::memory_modules(), spd),
            board: BoardCollector::new(platform::board_backend()),
            gpu: GpuCollector::new(platform::gpu_fallback()),
            network: NetworkCollector::new(platform::net_ext()),
            store: SnapshotStore::default(),
            last_stamp_micros: AtomicI64::new(i64::MIN),
        }
    }

    /// Full gather. Each collector that errors degrades only its own
    /// section to the empty default; the snapshot is always published.
    #[instrument(skip(self))]
    pub async fn gather(&self) -> Arc<SystemSnapshot> {
        let os = match self.os.collect().await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "os collector failed");
                OsFacts::default()
            }
        };
        let cpu = match self.cpu.collect().await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "cpu collector failed");
                CpuFacts::default()
            }
        };
        let memory = match self.memory.collect().await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "memory collector failed");
                MemoryFacts::default()
            }
        };
        let motherboard_bios = self.board.collect().await;
        let gpus = self.gpu.collect().await;
        let network = match self.network.collect().await {
            Ok(interfaces) => interfaces,
            Err(e) => {
                warn!(error = %e, "network collector failed");
                Vec::new()
            }
        };

        let snapshot = SystemSnapshot {
            collected_at: self.next_timestamp(),
            os,
            cpu,
            memory,
            motherboard_bios,
            gpus,
            network,
        };
        self.store.publish(snapshot).await
    }

    /// Re-run only the GPU chain and publish a snapshot cloned from the
    /// current one with fresh devices and timestamp. No-op before the
    /// first full gather. Last writer wins against a concurrent gather;
    /// either way the published snapshot is a complete one.
    #[instrument(skip(self))]
    pub async fn refresh_gpus(&self) -> Option<Arc<SystemSnapshot>> {
        let current = self.store.current().await?;
        let gpus = self.gpu.collect().await;
        let mut next = (*current).clone();
        next.gpus = gpus;
        next.collected_at = self.next_timestamp();
        Some(self.store.publish(next).await)
    }

    pub async fn current(&self) -> Option<Arc<SystemSnapshot>> {
        self.store.current().await
    }

    /// Wall clock, clamped so stamps never go backwards within one process
    /// even when the clock does.
    fn next_timestamp(&self) -> DateTime<Local> {
        let now = Local::now().timestamp_micros();
        let prev = self.last_stamp_micros.fetch_max(now, Ordering::AcqRel);
        let micros = now.max(prev);
        DateTime::from_timestamp_micros(micros)
            .map(|utc| utc.with_timezone(&Local))
            .unwrap_or_else(Local::now)
    }
}
