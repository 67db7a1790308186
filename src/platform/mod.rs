// Per-collector platform backends, selected once at startup

#[cfg(target_os = "linux")]
mod linux;
#[cfg(windows)]
mod windows;

use async_trait::async_trait;

use crate::collectors::SourceOutcome;
use crate::models::{GpuDevice, MemoryModule, MotherboardBiosFacts, NetworkInterface};

/// OS extension fields for the CPU collector, from whichever native source
/// the platform offers (/proc plus cpufreq sysfs, or the management
/// interface). Everything is optional; an empty extension is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuExtension {
    pub name: Option<String>,
    pub stepping: Option<String>,
    pub model: Option<String>,
    pub family: Option<String>,
    pub revision: Option<u16>,
    pub l2_cache_size: Option<String>,
    pub l3_cache_size: Option<String>,
    pub base_freq_mhz: Option<f64>,
    pub max_freq_mhz: Option<f64>,
    pub ext_clock_mhz: Option<u32>,
}

/// Link-level stats for one interface, where the OS exposes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkStats {
    pub is_up: Option<bool>,
    pub speed_mbps: Option<u64>,
    pub duplex: Option<String>,
}

pub trait CpuExt: Send + Sync {
    fn cpu_extension(&self) -> SourceOutcome<CpuExtension>;
}

pub trait MemoryModuleSource: Send + Sync {
    fn physical_modules(&self) -> SourceOutcome<Vec<MemoryModule>>;
}

#[async_trait]
pub trait BoardBackend: Send + Sync {
    async fn board_facts(&self) -> SourceOutcome<MotherboardBiosFacts>;
}

/// Last-resort GPU enumeration when no vendor backend yielded anything.
pub trait GpuFallback: Send + Sync {
    fn enumerate_controllers(&self) -> SourceOutcome<Vec<GpuDevice>>;
}

pub trait NetExt: Send + Sync {
    fn link_stats(&self, interface: &str) -> LinkStats;
    /// Fold platform adapter-configuration records into an already
    /// enumerated interface list, merging rather than duplicating rows.
    fn enrich(&self, _interfaces: &mut Vec<NetworkInterface>) {}
}

#[cfg(not(any(target_os = "linux", windows)))]
struct NullCpuExt;

#[cfg(not(any(target_os = "linux", windows)))]
impl CpuExt for NullCpuExt {
    fn cpu_extension(&self) -> SourceOutcome<CpuExtension> {
        SourceOutcome::Unavailable
    }
}

#[cfg(not(windows))]
struct NullMemoryModules;

#[cfg(not(windows))]
impl MemoryModuleSource for NullMemoryModules {
    fn physical_modules(&self) -> SourceOutcome<Vec<MemoryModule>> {
        SourceOutcome::Unavailable
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
struct NullBoardBackend;

#[cfg(not(any(target_os = "linux", windows)))]
#[async_trait]
impl BoardBackend for NullBoardBackend {
    async fn board_facts(&self) -> SourceOutcome<MotherboardBiosFacts> {
        SourceOutcome::Unavailable
    }
}

#[cfg(not(windows))]
struct NullGpuFallback;

#[cfg(not(windows))]
impl GpuFallback for NullGpuFallback {
    fn enumerate_controllers(&self) -> SourceOutcome<Vec<GpuDevice>> {
        SourceOutcome::Unavailable
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
struct NullNetExt;

#[cfg(not(any(target_os = "linux", windows)))]
impl NetExt for NullNetExt {
    fn link_stats(&self, _interface: &str) -> LinkStats {
        LinkStats::default()
    }
}

pub fn cpu_ext() -> Box<dyn CpuExt> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxCpuExt)
    }
    #[cfg(windows)]
    {
        Box::new(windows::WindowsCpuExt)
    }
    #[cfg(not(any(target_os = "linux", windows)))]
    {
        Box::new(NullCpuExt)
    }
}

pub fn memory_modules() -> Box<dyn MemoryModuleSource> {
    #[cfg(windows)]
    {
        Box::new(windows::WindowsMemoryModules)
    }
    #[cfg(not(windows))]
    {
        Box::new(NullMemoryModules)
    }
}

pub fn board_backend() -> Box<dyn BoardBackend> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxBoardBackend)
    }
    #[cfg(windows)]
    {
        Box::new(windows::WindowsBoardBackend)
    }
    #[cfg(not(any(target_os = "linux", windows)))]
    {
        Box::new(NullBoardBackend)
    }
}

pub fn gpu_fallback() -> Box<dyn GpuFallback> {
    #[cfg(windows)]
    {
        Box::new(windows::WindowsGpuFallback)
    }
    #[cfg(not(windows))]
    {
        Box::new(NullGpuFallback)
    }
}

pub fn net_ext() -> Box<dyn NetExt> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxNetExt)
    }
    #[cfg(windows)]
    {
        Box::new(windows::WindowsNetExt)
    }
    #[cfg(not(any(target_os = "linux", windows)))]
    {
        Box::new(NullNetExt)
    }
}
