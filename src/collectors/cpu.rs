// CPU facts: sysinfo counts/clocks merged with the CPUID probe and the
// platform extension source.

use std::sync::Arc;

use sysinfo::System;
use tracing::{debug, instrument};

use super::cpuid::{self, CpuIdProbe};
use crate::collectors::SourceOutcome;
use crate::models::CpuFacts;
use crate::platform::{CpuExt, CpuExtension};

pub struct CpuCollector {
    sys: Arc<std::sync::Mutex<System>>,
    ext: Arc<dyn CpuExt>,
}

/// Counts and clocks as sysinfo reports them, separated out so the merge
/// stays a pure function.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SysinfoCpuView {
    pub brand: Option<String>,
    pub count_physical: Option<usize>,
    pub count_logical: usize,
    pub current_freq_mhz: Option<f64>,
    pub per_core_mhz: Vec<Option<f64>>,
}

impl CpuCollector {
    pub fn new(ext: Box<dyn CpuExt>) -> Self {
        Self {
            sys: Arc::new(std::sync::Mutex::new(System::new())),
            ext: Arc::from(ext),
        }
    }

    #[instrument(skip(self), fields(collector = "cpu"))]
    pub async fn collect(&self) -> anyhow::Result<CpuFacts> {
        let sys = self.sys.clone();
        let ext = self.ext.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_cpu_all();

            let per_core_mhz: Vec<Option<f64>> = sys
                .cpus()
                .iter()
                .map(|c| {
                    let mhz = c.frequency();
                    if mhz > 0 { Some(mhz as f64) } else { None }
                })
                .collect();
            let view = SysinfoCpuView {
                brand: sys
                    .cpus()
                    .first()
                    .map(|c| c.brand().trim().to_string())
                    .filter(|s| !s.is_empty()),
                count_physical: System::physical_core_count(),
                count_logical: sys.cpus().len(),
                current_freq_mhz: per_core_mhz.first().copied().flatten(),
                per_core_mhz,
            };

            let probe = cpuid::probe();
            let extension = match ext.cpu_extension() {
                SourceOutcome::Yielded(e) => Some(e),
                SourceOutcome::Unavailable => None,
                SourceOutcome::Failed(reason) => {
                    debug!(reason = %reason, "cpu extension source failed");
                    None
                }
            };

            Ok(merge_cpu_facts(probe, extension, view))
        })
        .await
        .map_err(|e| anyhow::anyhow!("cpu collector task join: {}", e))?
    }
}

/// Per-field precedence: the probe's identification wins where present,
/// the extension fills stepping/revision/clock gaps, sysinfo supplies the
/// counts. A missing source contributes nothing.
pub(crate) fn merge_cpu_facts(
    probe: Option<CpuIdProbe>,
    extension: Option<CpuExtension>,
    view: SysinfoCpuView,
) -> CpuFacts {
    let probe = probe.unwrap_or_default();
    let ext = extension.unwrap_or_default();
    CpuFacts {
        brand: probe
            .brand
            .or(ext.name)
            .or(view.brand)
            .unwrap_or_default(),
        arch: std::env::consts::ARCH.to_string(),
        bits: usize::BITS,
        count_physical: view.count_physical,
        count_logical: view.count_logical,
        base_freq_mhz: ext.base_freq_mhz,
        max_freq_mhz: ext.max_freq_mhz,
        current_freq_mhz: view.current_freq_mhz,
        per_core_mhz: view.per_core_mhz,
        flags: probe.flags,
        l2_cache_size: probe.l2_cache_size.or(ext.l2_cache_size),
        l3_cache_size: probe.l3_cache_size.or(ext.l3_cache_size),
        vendor_id: probe.vendor_id,
        hz_advertised: probe.hz_advertised,
        hz_actual: probe.hz_actual,
        stepping: ext.stepping.or(probe.stepping),
        revision: ext.revision,
        ext_clock_mhz: ext.ext_clock_mhz,
        cache_line_size_bytes: probe.cache_line_size_bytes,
        tdp_watts: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> SysinfoCpuView {
        SysinfoCpuView {
            brand: Some("Sysinfo Brand".into()),
            count_physical: Some(4),
            count_logical: 8,
            current_freq_mhz: Some(3200.0),
            per_core_mhz: vec![Some(3200.0); 8],
        }
    }

    #[test]
    fn probe_cache_size_wins_over_extension() {
        let probe = CpuIdProbe {
            l2_cache_size: Some("512 KB".into()),
            ..CpuIdProbe::default()
        };
        let ext = CpuExtension {
            l2_cache_size: Some("1024 KB".into()),
            l3_cache_size: Some("16384 KB".into()),
            ..CpuExtension::default()
        };
        let facts = merge_cpu_facts(Some(probe), Some(ext), view());
        assert_eq!(facts.l2_cache_size.as_deref(), Some("512 KB"));
        assert_eq!(facts.l3_cache_size.as_deref(), Some("16384 KB"));
    }

    #[test]
    fn extension_stepping_wins_over_probe() {
        let probe = CpuIdProbe {
            stepping: Some("7".into()),
            ..CpuIdProbe::default()
        };
        let ext = CpuExtension {
            stepping: Some("13".into()),
            ..CpuExtension::default()
        };
        let facts = merge_cpu_facts(Some(probe), Some(ext), view());
        assert_eq!(facts.stepping.as_deref(), Some("13"));
    }

    #[test]
    fn brand_falls_back_probe_extension_sysinfo() {
        let facts = merge_cpu_facts(None, None, view());
        assert_eq!(facts.brand, "Sysinfo Brand");

        let ext = CpuExtension {
            name: Some("Ext Name".into()),
            ..CpuExtension::default()
        };
        let facts = merge_cpu_facts(None, Some(ext), view());
        assert_eq!(facts.brand, "Ext Name");

        let probe = CpuIdProbe {
            brand: Some("Probe Brand".into()),
            ..CpuIdProbe::default()
        };
        let facts = merge_cpu_facts(Some(probe), None, view());
        assert_eq!(facts.brand, "Probe Brand");
    }

    #[test]
    fn missing_sources_leave_fields_absent() {
        let facts = merge_cpu_facts(None, None, SysinfoCpuView::default());
        assert!(facts.brand.is_empty());
        assert_eq!(facts.count_logical, 0);
        assert_eq!(facts.stepping, None);
        assert_eq!(facts.revision, None);
        assert_eq!(facts.tdp_watts, None);
        assert!(facts.flags.is_empty());
    }
}
