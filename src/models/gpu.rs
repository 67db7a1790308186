// GPU device records, one per backend sighting

use serde::{Deserialize, Serialize};

/// Which backend produced a record. The device list is a union across
/// backends, so one physical GPU may appear under several sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuSource {
    #[serde(rename = "nvml")]
    Nvml,
    #[serde(rename = "nvidia-smi")]
    NvidiaSmi,
    #[serde(rename = "rocm-smi")]
    RocmSmi,
    #[serde(rename = "intel_gpu_top")]
    IntelGpuTop,
    #[serde(rename = "WMI")]
    Wmi,
}

impl GpuSource {
    /// Tag used in logs and the one-shot summary; matches the serialized name.
    pub fn as_str(self) -> &'static str {
        match self {
            GpuSource::Nvml => "nvml",
            GpuSource::NvidiaSmi => "nvidia-smi",
            GpuSource::RocmSmi => "rocm-smi",
            GpuSource::IntelGpuTop => "intel_gpu_top",
            GpuSource::Wmi => "WMI",
        }
    }
}

/// Fields a backend does not report stay absent, never zeroed. Memory
/// figures are normalized to bytes whatever unit the source used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuDevice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_used_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_graphics_mhz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_mem_mhz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnp_id: Option<String>,
    pub source: GpuSource,
}

impl GpuDevice {
    pub fn empty(source: GpuSource) -> Self {
        Self {
            name: None,
            driver: None,
            memory_total_bytes: None,
            memory_used_bytes: None,
            load_percent: None,
            temperature_c: None,
            power_w: None,
            fan_percent: None,
            clock_graphics_mhz: None,
            clock_mem_mhz: None,
            uuid: None,
            pnp_id: None,
            source,
        }
    }

    /// True when no field besides the source tag is populated.
    pub fn is_blank(&self) -> bool {
        self.name.is_none()
            && self.driver.is_none()
            && self.memory_total_bytes.is_none()
            && self.memory_used_bytes.is_none()
            && self.load_percent.is_none()
            && self.temperature_c.is_none()
            && self.power_w.is_none()
            && self.fan_percent.is_none()
            && self.clock_graphics_mhz.is_none()
            && self.clock_mem_mhz.is_none()
            && self.uuid.is_none()
            && self.pnp_id.is_none()
    }
}
