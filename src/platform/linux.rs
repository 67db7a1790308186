// Linux backends: /proc/cpuinfo, cpufreq sysfs, DMI sysfs, dmidecode, link stats.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{BoardBackend, CpuExt, CpuExtension, LinkStats, NetExt};
use crate::collectors::SourceOutcome;
use crate::collectors::board::normalize_dmi_date;
use crate::exec;
use crate::models::{BiosFacts, MotherboardBiosFacts, MotherboardFacts};

pub(super) struct LinuxCpuExt;

impl CpuExt for LinuxCpuExt {
    fn cpu_extension(&self) -> SourceOutcome<CpuExtension> {
        let mut ext = match std::fs::read_to_string("/proc/cpuinfo") {
            Ok(content) => parse_proc_cpuinfo(&content),
            Err(e) => {
                debug!(error = %e, "cannot read /proc/cpuinfo");
                CpuExtension::default()
            }
        };
        ext.base_freq_mhz = read_cpufreq_mhz("cpuinfo_min_freq");
        ext.max_freq_mhz = read_cpufreq_mhz("cpuinfo_max_freq");
        if ext == CpuExtension::default() {
            SourceOutcome::Unavailable
        } else {
            SourceOutcome::Yielded(ext)
        }
    }
}

/// First occurrence per key wins; values are kept in source form.
pub(super) fn parse_proc_cpuinfo(content: &str) -> CpuExtension {
    let mut ext = CpuExtension::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key {
            "model name" if ext.name.is_none() => ext.name = Some(value.to_string()),
            "stepping" if ext.stepping.is_none() => ext.stepping = Some(value.to_string()),
            "model" if ext.model.is_none() => ext.model = Some(value.to_string()),
            "cpu family" if ext.family.is_none() => ext.family = Some(value.to_string()),
            // The unified "cache size" line reports the last-level cache.
            "cache size" if ext.l3_cache_size.is_none() => {
                ext.l3_cache_size = Some(value.to_string())
            }
            _ => {}
        }
    }
    ext
}

/// Read one cpu0 cpufreq value (kHz in sysfs) as MHz.
fn read_cpufreq_mhz(leaf: &str) -> Option<f64> {
    let path = format!("/sys/devices/system/cpu/cpu0/cpufreq/{}", leaf);
    let khz: f64 = std::fs::read_to_string(path).ok()?.trim().parse().ok()?;
    if khz > 0.0 { Some(khz / 1000.0) } else { None }
}

pub(super) struct LinuxBoardBackend;

#[async_trait]
impl BoardBackend for LinuxBoardBackend {
    async fn board_facts(&self) -> SourceOutcome<MotherboardBiosFacts> {
        let mut facts = match tokio::task::spawn_blocking(read_dmi_structured).await {
            Ok(facts) => facts,
            Err(e) => {
                debug!(error = %e, "dmi sysfs task join");
                MotherboardBiosFacts::default()
            }
        };

        // Raw dmidecode output is only worth keeping when sysfs gave nothing.
        if facts.is_empty() {
            let args = ["-t", "baseboard", "-t", "bios"];
            match exec::run_bounded("dmidecode", &args, Duration::from_secs(6)).await {
                SourceOutcome::Yielded(raw) => {
                    if !raw.trim().is_empty() {
                        facts.raw_dmidecode = Some(raw);
                    }
                }
                SourceOutcome::Failed(reason) => debug!(reason = %reason, "dmidecode failed"),
                SourceOutcome::Unavailable => {}
            }
        }

        if facts.is_empty() {
            SourceOutcome::Unavailable
        } else {
            SourceOutcome::Yielded(facts)
        }
    }
}

fn read_dmi_id(name: &str) -> Option<String> {
    let v = std::fs::read_to_string(format!("/sys/class/dmi/id/{}", name)).ok()?;
    let v = v.trim();
    if v.is_empty() { None } else { Some(v.to_string()) }
}

fn read_dmi_structured() -> MotherboardBiosFacts {
    let motherboard = MotherboardFacts {
        manufacturer: read_dmi_id("board_vendor"),
        product: read_dmi_id("board_name"),
        serial_number: read_dmi_id("board_serial"),
        version: read_dmi_id("board_version"),
    };
    let bios = BiosFacts {
        manufacturer: read_dmi_id("bios_vendor"),
        smbios_version: read_dmi_id("bios_version"),
        release_date: read_dmi_id("bios_date").map(|raw| normalize_dmi_date(&raw).unwrap_or(raw)),
        version: read_dmi_id("bios_release"),
    };
    MotherboardBiosFacts {
        motherboard: (motherboard != MotherboardFacts::default()).then_some(motherboard),
        bios: (bios != BiosFacts::default()).then_some(bios),
        raw_dmidecode: None,
    }
}

pub(super) struct LinuxNetExt;

impl NetExt for LinuxNetExt {
    fn link_stats(&self, interface: &str) -> LinkStats {
        let read = |leaf: &str| -> Option<String> {
            let path = format!("/sys/class/net/{}/{}", interface, leaf);
            let v = std::fs::read_to_string(path).ok()?;
            let v = v.trim();
            if v.is_empty() { None } else { Some(v.to_string()) }
        };
        let is_up = read("operstate").and_then(|s| match s.as_str() {
            "up" => Some(true),
            "down" => Some(false),
            _ => None,
        });
        let speed_mbps = read("speed")
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|&mbps| mbps > 0)
            .map(|mbps| mbps as u64);
        let duplex = read("duplex").filter(|d| d == "full" || d == "half");
        LinkStats {
            is_up,
            speed_mbps,
            duplex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 158
model name\t: Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz
stepping\t: 13
cache size\t: 12288 KB

processor\t: 1
model\t\t: 999
";

    #[test]
    fn parses_first_processor_block() {
        let ext = parse_proc_cpuinfo(CPUINFO);
        assert_eq!(
            ext.name.as_deref(),
            Some("Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz")
        );
        assert_eq!(ext.stepping.as_deref(), Some("13"));
        assert_eq!(ext.model.as_deref(), Some("158"));
        assert_eq!(ext.family.as_deref(), Some("6"));
        assert_eq!(ext.l3_cache_size.as_deref(), Some("12288 KB"));
    }

    #[test]
    fn model_name_does_not_shadow_model() {
        let ext = parse_proc_cpuinfo("model name : Foo\nmodel : 42\n");
        assert_eq!(ext.name.as_deref(), Some("Foo"));
        assert_eq!(ext.model.as_deref(), Some("42"));
    }

    #[test]
    fn empty_input_yields_default() {
        assert_eq!(parse_proc_cpuinfo(""), CpuExtension::default());
    }
}
