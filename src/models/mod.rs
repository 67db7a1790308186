// Snapshot domain models

mod board;
mod cpu;
mod gpu;
mod memory;
mod network;
mod os;
mod snapshot;

pub use board::{BiosFacts, MotherboardBiosFacts, MotherboardFacts};
pub use cpu::CpuFacts;
pub use gpu::{GpuDevice, GpuSource};
pub use memory::{MemoryFacts, MemoryModule, SpdTiming};
pub use network::NetworkInterface;
pub use os::OsFacts;
pub use snapshot::SystemSnapshot;
