// Motherboard and BIOS identity

use serde::{Deserialize, Serialize};

/// Baseboard/BIOS section. Entirely empty on hosts where neither the
/// management interface nor a DMI source is readable; an empty section
/// never fails a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotherboardBiosFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motherboard: Option<MotherboardFacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bios: Option<BiosFacts>,
    /// Verbatim tool output kept when only unstructured data is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_dmidecode: Option<String>,
}

impl MotherboardBiosFacts {
    pub fn is_empty(&self) -> bool {
        self.motherboard.is_none() && self.bios.is_none() && self.raw_dmidecode.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotherboardFacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiosFacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smbios_version: Option<String>,
    /// ISO-8601 when the packed source form parsed, else the raw string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
