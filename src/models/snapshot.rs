// Root snapshot model

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{CpuFacts, GpuDevice, MemoryFacts, MotherboardBiosFacts, NetworkInterface, OsFacts};

/// One complete, immutable point-in-time inventory. A refresh builds a new
/// snapshot and publishes it by whole-object replacement; nothing mutates
/// an already-published one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub collected_at: DateTime<Local>,
    pub os: OsFacts,
    pub cpu: CpuFacts,
    pub memory: MemoryFacts,
    pub motherboard_bios: MotherboardBiosFacts,
    pub gpus: Vec<GpuDevice>,
    pub network: Vec<NetworkInterface>,
}
