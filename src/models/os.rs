// OS identity and uptime

use serde::{Deserialize, Serialize};

/// Kernel/OS identity. Always fully populated; the sources behind it
/// (uname-equivalents and boot time) are assumed present on any host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsFacts {
    pub system: String,
    pub node: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub processor_string: String,
    pub boot_time: String,
    pub uptime_seconds: u64,
}
