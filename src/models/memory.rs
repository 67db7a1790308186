// Memory counters, physical modules and SPD timings

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One SPD/timing record. The schema is heuristic by nature (it depends on
/// which report or tool produced it), so this stays a loose key/value map;
/// values keep whatever shape the parser recovered (number or string).
pub type SpdTiming = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryFacts {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<MemoryModule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spd: Option<Vec<SpdTiming>>,
}

/// One physical DIMM as reported by the platform management interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryModule {
    pub capacity_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mhz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_speed_mhz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Raw SMBIOS memory-type code as reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smbios_memory_type: Option<u32>,
    /// Decoded DDR-generation label for the code above, when recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_factor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_detail: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_width: Option<u32>,
}
