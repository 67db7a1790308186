// Memory counters, physical DIMM inventory and SPD timing attachment

use std::sync::Arc;

use sysinfo::System;
use tracing::{debug, instrument};

use super::spd::SpdReader;
use crate::collectors::SourceOutcome;
use crate::config::SpdConfig;
use crate::models::MemoryFacts;
use crate::platform::MemoryModuleSource;

pub struct MemoryCollector {
    sys: Arc<std::sync::Mutex<System>>,
    modules: Arc<dyn MemoryModuleSource>,
    spd: SpdReader,
}

impl MemoryCollector {
    pub fn new(modules: Box<dyn MemoryModuleSource>, spd_config: SpdConfig) -> Self {
        Self {
            sys: Arc::new(std::sync::Mutex::new(System::new())),
            modules: Arc::from(modules),
            spd: SpdReader::new(spd_config),
        }
    }

    #[instrument(skip(self), fields(collector = "memory"))]
    pub async fn collect(&self) -> anyhow::Result<MemoryFacts> {
        let sys = self.sys.clone();
        let modules = self.modules.clone();
        let mut facts = tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_memory();

            let total = sys.total_memory();
            let available = sys.available_memory();
            let used = total.saturating_sub(available);
            let swap_total = sys.total_swap();
            let swap_used = sys.used_swap();

            let modules = match modules.physical_modules() {
                SourceOutcome::Yielded(list) if !list.is_empty() => Some(list),
                SourceOutcome::Yielded(_) | SourceOutcome::Unavailable => None,
                SourceOutcome::Failed(reason) => {
                    debug!(reason = %reason, "physical module source failed");
                    None
                }
            };

            Ok::<_, anyhow::Error>(MemoryFacts {
                total,
                available,
                used,
                percent: ratio_percent(used, total),
                swap_total,
                swap_used,
                swap_percent: ratio_percent(swap_used, swap_total),
                modules,
                spd: None,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("memory collector task join: {}", e))??;

        facts.spd = match self.spd.read().await {
            SourceOutcome::Yielded(timings) => Some(timings),
            SourceOutcome::Unavailable => None,
            SourceOutcome::Failed(reason) => {
                debug!(reason = %reason, "spd source failed");
                None
            }
        };
        Ok(facts)
    }
}

/// Usage percentage rounded to one decimal; zero when the denominator is
/// zero (hosts without swap).
pub(crate) fn ratio_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// SMBIOS memory-type code to DDR generation label. Codes 23 and 25 are
/// reserved in the tables this matches and stay undecoded.
pub fn decode_smbios_memory_type(code: u32) -> Option<&'static str> {
    let label = match code {
        20 => "DDR",
        21 => "DDR2",
        22 => "DDR2 FB-DIMM",
        24 => "DDR3",
        26 => "DDR4",
        27 => "LPDDR",
        28 => "LPDDR2",
        29 => "LPDDR3",
        30 => "LPDDR4",
        31 => "Logical non-volatile device",
        32 => "HBM",
        33 => "HBM2",
        34 => "DDR5",
        _ => return None,
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_rounds_to_one_decimal() {
        assert_eq!(ratio_percent(1, 3), 33.3);
        assert_eq!(ratio_percent(2, 3), 66.7);
        assert_eq!(ratio_percent(1, 2), 50.0);
        assert_eq!(ratio_percent(0, 100), 0.0);
    }

    #[test]
    fn zero_denominator_means_zero_percent() {
        assert_eq!(ratio_percent(0, 0), 0.0);
        assert_eq!(ratio_percent(5, 0), 0.0);
    }

    #[test]
    fn smbios_codes_decode_to_generations() {
        assert_eq!(decode_smbios_memory_type(26), Some("DDR4"));
        assert_eq!(decode_smbios_memory_type(34), Some("DDR5"));
        assert_eq!(decode_smbios_memory_type(20), Some("DDR"));
        assert_eq!(decode_smbios_memory_type(33), Some("HBM2"));
    }

    #[test]
    fn unknown_smbios_codes_stay_undecoded() {
        assert_eq!(decode_smbios_memory_type(0), None);
        assert_eq!(decode_smbios_memory_type(23), None);
        assert_eq!(decode_smbios_memory_type(25), None);
        assert_eq!(decode_smbios_memory_type(99), None);
    }

    #[tokio::test]
    async fn counters_are_consistent() {
        let collector = MemoryCollector::new(
            crate::platform::memory_modules(),
            SpdConfig::default(),
        );
        let facts = collector.collect().await.unwrap();
        assert!(facts.total > 0);
        assert_eq!(facts.used, facts.total - facts.available);
        assert!(facts.percent >= 0.0 && facts.percent <= 100.0);
    }
}
