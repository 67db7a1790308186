// One collector per snapshot section, plus the shared outcome type

pub mod board;
pub mod cpu;
pub(crate) mod cpuid;
pub mod gpu;
pub mod memory;
pub mod network;
pub mod os;
mod outcome;
pub mod spd;

pub use board::BoardCollector;
pub use cpu::CpuCollector;
pub use gpu::GpuCollector;
pub use memory::MemoryCollector;
pub use network::NetworkCollector;
pub use os::OsCollector;
pub use outcome::SourceOutcome;
pub use spd::SpdReader;
