// GPU inventory: ordered best-effort backend chain, unioned not merged

use std::sync::Arc;
use std::time::Duration;

use nvml_wrapper::Nvml;
use nvml_wrapper::enum_wrappers::device::{Clock, TemperatureSensor};
use tracing::{debug, instrument};

use crate::collectors::SourceOutcome;
use crate::exec;
use crate::models::{GpuDevice, GpuSource};
use crate::platform::GpuFallback;

const NVIDIA_SMI_FIELDS: &str = "name,driver_version,memory.total,memory.used,temperature.gpu,power.draw,fan.speed,clocks.gr,clocks.mem";
const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(5);
const ROCM_SMI_TIMEOUT: Duration = Duration::from_secs(6);
const INTEL_GPU_TOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GpuCollector {
    nvml: Option<Arc<Nvml>>,
    fallback: Arc<dyn GpuFallback>,
}

impl GpuCollector {
    /// NVML is initialized once here; hosts without the library simply run
    /// the chain without it.
    pub fn new(fallback: Box<dyn GpuFallback>) -> Self {
        let nvml = match Nvml::init() {
            Ok(nvml) => Some(Arc::new(nvml)),
            Err(e) => {
                debug!(error = %e, "NVML unavailable");
                None
            }
        };
        Self {
            nvml,
            fallback: Arc::from(fallback),
        }
    }

    /// Run the whole backend chain. Every backend that produced records
    /// contributes them verbatim, each tagged with its source; nothing is
    /// deduplicated, so one physical GPU may appear more than once. The
    /// platform fallback is consulted only when the chain stayed empty.
    #[instrument(skip(self), fields(collector = "gpu"))]
    pub async fn collect(&self) -> Vec<GpuDevice> {
        let mut devices = Vec::new();

        if let Some(nvml) = self.nvml.clone() {
            match tokio::task::spawn_blocking(move || read_nvml_devices(&nvml)).await {
                Ok(list) => devices.extend(list),
                Err(e) => debug!(error = %e, "nvml task join failed"),
            }
        }

        let query = format!("--query-gpu={}", NVIDIA_SMI_FIELDS);
        match exec::run_bounded(
            "nvidia-smi",
            &[query.as_str(), "--format=csv,noheader,nounits"],
            NVIDIA_SMI_TIMEOUT,
        )
        .await
        {
            SourceOutcome::Yielded(out) => devices.extend(parse_nvidia_smi_csv(&out)),
            SourceOutcome::Unavailable => {}
            SourceOutcome::Failed(reason) => debug!(reason = %reason, "nvidia-smi failed"),
        }

        match exec::run_bounded("rocm-smi", &["-a"], ROCM_SMI_TIMEOUT).await {
            SourceOutcome::Yielded(out) => devices.extend(parse_rocm_smi(&out)),
            SourceOutcome::Unavailable => {}
            SourceOutcome::Failed(reason) => debug!(reason = %reason, "rocm-smi failed"),
        }

        match exec::run_bounded(
            "intel_gpu_top",
            &["-J", "-s", "100", "-o", "-"],
            INTEL_GPU_TOP_TIMEOUT,
        )
        .await
        {
            SourceOutcome::Yielded(out) => devices.extend(parse_intel_gpu_top(&out)),
            SourceOutcome::Unavailable => {}
            SourceOutcome::Failed(reason) => debug!(reason = %reason, "intel_gpu_top failed"),
        }

        if devices.is_empty() {
            let fallback = self.fallback.clone();
            match tokio::task::spawn_blocking(move || fallback.enumerate_controllers()).await {
                Ok(SourceOutcome::Yielded(list)) => devices.extend(list),
                Ok(SourceOutcome::Unavailable) => {}
                Ok(SourceOutcome::Failed(reason)) => {
                    debug!(reason = %reason, "controller fallback failed")
                }
                Err(e) => debug!(error = %e, "controller fallback task join failed"),
            }
        }

        devices
    }
}

/// One record per NVML device. The driver version is system-wide, so it is
/// stamped onto every record.
fn read_nvml_devices(nvml: &Nvml) -> Vec<GpuDevice> {
    let driver = nvml.sys_driver_version().ok();
    let count = match nvml.device_count() {
        Ok(count) => count,
        Err(e) => {
            debug!(error = %e, "nvml device count failed");
            return Vec::new();
        }
    };
    let mut devices = Vec::new();
    for index in 0..count {
        let device = match nvml.device_by_index(index) {
            Ok(device) => device,
            Err(e) => {
                debug!(index, error = %e, "nvml device lookup failed");
                continue;
            }
        };
        let mut record = GpuDevice::empty(GpuSource::Nvml);
        record.name = device.name().ok();
        record.driver = driver.clone();
        if let Ok(mem) = device.memory_info() {
            record.memory_total_bytes = Some(mem.total);
            record.memory_used_bytes = Some(mem.used);
        }
        record.load_percent = device.utilization_rates().map(|u| u.gpu as f64).ok();
        record.temperature_c = device
            .temperature(TemperatureSensor::Gpu)
            .map(|t| t as f64)
            .ok();
        record.uuid = device.uuid().ok();
        record.power_w = device.power_usage().map(|mw| mw as f64 / 1000.0).ok();
        record.fan_percent = device.fan_speed(0).ok();
        record.clock_graphics_mhz = device.clock_info(Clock::Graphics).ok();
        record.clock_mem_mhz = device.clock_info(Clock::Memory).ok();
        devices.push(record);
    }
    devices
}

/// Fixed nine-column CSV, `noheader,nounits`. Rows with fewer columns are
/// skipped; malformed numeric cells become absent fields, never a dropped
/// row. Memory figures arrive in MB and are normalized to bytes.
pub(crate) fn parse_nvidia_smi_csv(out: &str) -> Vec<GpuDevice> {
    let mut devices = Vec::new();
    for line in out.trim().lines() {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 9 {
            continue;
        }
        let mut record = GpuDevice::empty(GpuSource::NvidiaSmi);
        record.name = Some(parts[0].to_string()).filter(|s| !s.is_empty());
        record.driver = Some(parts[1].to_string()).filter(|s| !s.is_empty());
        record.memory_total_bytes = parse_mb_to_bytes(parts[2]);
        record.memory_used_bytes = parse_mb_to_bytes(parts[3]);
        record.temperature_c = parse_f64_loose(parts[4]);
        record.power_w = parse_f64_loose(parts[5]);
        record.fan_percent = parse_u32_loose(&parts[6].replace('%', ""));
        record.clock_graphics_mhz = parse_u32_loose(parts[7]);
        record.clock_mem_mhz = parse_u32_loose(parts[8]);
        devices.push(record);
    }
    devices
}

/// `rocm-smi -a` free text. Only lines mentioning GPU and holding a colon
/// are considered; the value is whatever follows the last colon. At most
/// one record, and only when at least one field actually parsed.
pub(crate) fn parse_rocm_smi(out: &str) -> Option<GpuDevice> {
    let mut record = GpuDevice::empty(GpuSource::RocmSmi);
    for line in out.lines() {
        let line = line.trim();
        if !line.contains("GPU") {
            continue;
        }
        let Some((_, value)) = line.rsplit_once(':') else {
            continue;
        };
        let value = value.trim();
        if line.contains("Temperature") {
            record.temperature_c = parse_f64_loose(&value.replace('C', ""));
        }
        if line.contains("Average Graphics Package Power") || line.contains("Power (Average)") {
            record.power_w = parse_f64_loose(&value.replace('W', ""));
        }
        if line.contains("GPU use") || line.contains("GPU% busy") {
            record.load_percent = parse_f64_loose(&value.replace('%', "")).map(f64::trunc);
        }
    }
    if record.is_blank() { None } else { Some(record) }
}

/// One `intel_gpu_top -J` sample: average `busy` across the engines into a
/// single load figure, rounded to one decimal. Engines may arrive as an
/// array or as a name-keyed object depending on tool version; an engine
/// without a numeric `busy` counts as idle.
pub(crate) fn parse_intel_gpu_top(out: &str) -> Option<GpuDevice> {
    let value: serde_json::Value = serde_json::from_str(out.trim()).ok()?;
    let engines = value.get("engines")?;
    let busy_of = |engine: &serde_json::Value| -> Option<f64> {
        match engine.get("busy") {
            None => Some(0.0),
            Some(v) => v.as_f64(),
        }
    };
    let busy: Vec<f64> = match engines {
        serde_json::Value::Array(list) => list.iter().filter_map(busy_of).collect(),
        serde_json::Value::Object(map) => map.values().filter_map(busy_of).collect(),
        _ => return None,
    };
    if busy.is_empty() {
        return None;
    }
    let avg = busy.iter().sum::<f64>() / busy.len() as f64;
    let mut record = GpuDevice::empty(GpuSource::IntelGpuTop);
    record.load_percent = Some((avg * 10.0).round() / 10.0);
    Some(record)
}

fn parse_f64_loose(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_u32_loose(s: &str) -> Option<u32> {
    let v = parse_f64_loose(s)?;
    if (0.0..=u32::MAX as f64).contains(&v) {
        Some(v as u32)
    } else {
        None
    }
}

fn parse_mb_to_bytes(s: &str) -> Option<u64> {
    let v = parse_f64_loose(s)?;
    if v < 0.0 {
        return None;
    }
    Some((v * 1024.0 * 1024.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NVIDIA_LINE: &str =
        "NVIDIA GeForce RTX 3080, 535.86.05, 10240, 1024, 55, 220.50, 30 %, 1710, 9500";

    #[test]
    fn nvidia_csv_row_parses_with_mb_normalized_to_bytes() {
        let devices = parse_nvidia_smi_csv(NVIDIA_LINE);
        assert_eq!(devices.len(), 1);
        let d = &devices[0];
        assert_eq!(d.name.as_deref(), Some("NVIDIA GeForce RTX 3080"));
        assert_eq!(d.driver.as_deref(), Some("535.86.05"));
        assert_eq!(d.memory_total_bytes, Some(10240 * 1024 * 1024));
        assert_eq!(d.memory_used_bytes, Some(1024 * 1024 * 1024));
        assert_eq!(d.temperature_c, Some(55.0));
        assert_eq!(d.power_w, Some(220.5));
        assert_eq!(d.fan_percent, Some(30));
        assert_eq!(d.clock_graphics_mhz, Some(1710));
        assert_eq!(d.clock_mem_mhz, Some(9500));
        assert_eq!(d.source, GpuSource::NvidiaSmi);
    }

    #[test]
    fn nvidia_malformed_numerics_become_absent_not_dropped_rows() {
        let devices = parse_nvidia_smi_csv(
            "Tesla T4, 525.105.17, [N/A], [N/A], 42, [N/A], [N/A], 585, 5001",
        );
        assert_eq!(devices.len(), 1);
        let d = &devices[0];
        assert_eq!(d.memory_total_bytes, None);
        assert_eq!(d.memory_used_bytes, None);
        assert_eq!(d.temperature_c, Some(42.0));
        assert_eq!(d.power_w, None);
        assert_eq!(d.fan_percent, None);
        assert_eq!(d.clock_graphics_mhz, Some(585));
    }

    #[test]
    fn nvidia_short_rows_are_skipped() {
        assert!(parse_nvidia_smi_csv("only, four, fields, here\n").is_empty());
        assert_eq!(
            parse_nvidia_smi_csv(&format!("short, row\n{}\n", NVIDIA_LINE)).len(),
            1
        );
    }

    #[test]
    fn rocm_keyword_lines_fill_one_record() {
        let out = "GPU[0] : Temperature (Sensor die): 61.0C\n\
                   GPU[0] : Average Graphics Package Power (W): 87.5W\n\
                   GPU[0] : GPU use (%): 43.9%\n\
                   Some unrelated line\n";
        let d = parse_rocm_smi(out).unwrap();
        assert_eq!(d.temperature_c, Some(61.0));
        assert_eq!(d.power_w, Some(87.5));
        assert_eq!(d.load_percent, Some(43.0));
        assert_eq!(d.source, GpuSource::RocmSmi);
    }

    #[test]
    fn rocm_without_any_parsed_field_yields_nothing() {
        assert_eq!(parse_rocm_smi("========= ROCm System Management =========\n"), None);
        assert_eq!(parse_rocm_smi("GPU[0] : Serial Number: 0xdeadbeef\n"), None);
    }

    #[test]
    fn intel_engines_array_averages_busy() {
        let out = r#"{"engines": [{"busy": 10.0}, {"busy": 30.0}, {"busy": 20.1}]}"#;
        let d = parse_intel_gpu_top(out).unwrap();
        assert_eq!(d.load_percent, Some(20.0));
        assert_eq!(d.source, GpuSource::IntelGpuTop);
    }

    #[test]
    fn intel_engines_object_counts_missing_busy_as_idle() {
        let out = r#"{"engines": {"Render/3D/0": {"busy": 40.0}, "Video/0": {}}}"#;
        let d = parse_intel_gpu_top(out).unwrap();
        assert_eq!(d.load_percent, Some(20.0));
    }

    #[test]
    fn intel_without_engines_yields_nothing() {
        assert_eq!(parse_intel_gpu_top(r#"{"frequency": {}}"#), None);
        assert_eq!(parse_intel_gpu_top("not json"), None);
        assert_eq!(parse_intel_gpu_top(r#"{"engines": []}"#), None);
    }

    #[test]
    fn union_keeps_every_backend_record_tagged() {
        let mut devices = parse_nvidia_smi_csv(NVIDIA_LINE);
        devices.extend(parse_rocm_smi("GPU[0] : GPU use (%): 12\n"));
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].source, GpuSource::NvidiaSmi);
        assert_eq!(devices[1].source, GpuSource::RocmSmi);
    }
}
