// CPU identification, clocks and caches

use serde::{Deserialize, Serialize};

/// Merged view of the CPUID probe, the OS extension source and sysinfo.
/// Any field a source did not supply stays absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuFacts {
    pub brand: String,
    pub arch: String,
    pub bits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_physical: Option<usize>,
    pub count_logical: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_freq_mhz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_freq_mhz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_freq_mhz: Option<f64>,
    /// One entry per logical core; an entry is None when the OS does not
    /// report that core's clock.
    pub per_core_mhz: Vec<Option<f64>>,
    /// Capped at 64 entries, lexicographically sorted.
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l2_cache_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l3_cache_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hz_advertised: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hz_actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stepping: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext_clock_mhz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_line_size_bytes: Option<u32>,
    /// No portable source exists; kept in the schema, never populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tdp_watts: Option<f64>,
}
