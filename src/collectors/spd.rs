// SPD timing discovery: hardware-monitor report files or a decode-dimms
// text dump. Schema is heuristic; anything unreadable yields nothing.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::collectors::SourceOutcome;
use crate::config::SpdConfig;
use crate::models::SpdTiming;

const WELL_KNOWN_REPORTS: [(&str, &str); 2] = [
    ("LibreHardwareMonitor", "LibreHardwareMonitorReport.json"),
    ("OpenHardwareMonitor", "OpenHardwareMonitorReport.json"),
];

pub struct SpdReader {
    config: SpdConfig,
}

impl SpdReader {
    pub fn new(config: SpdConfig) -> Self {
        Self { config }
    }

    /// Locate and parse SPD timings. A located report wins outright, even
    /// when it turns out unparseable; the decode-dimms dump is consulted
    /// only when no report could be found at all.
    #[instrument(skip(self), fields(collector = "spd"))]
    pub async fn read(&self) -> SourceOutcome<Vec<SpdTiming>> {
        if let Some(path) = self.locate_report() {
            debug!(path = %path.display(), "reading hardware monitor report");
            return match tokio::fs::read_to_string(&path).await {
                Ok(text) => match parse_report_text(&text) {
                    Some(timings) => SourceOutcome::Yielded(timings),
                    None => {
                        warn!(path = %path.display(), "report held no timing fields");
                        SourceOutcome::Unavailable
                    }
                },
                Err(e) => SourceOutcome::Failed(format!("read {}: {}", path.display(), e)),
            };
        }
        if let Some(path) = &self.config.decode_dimms_path {
            if path.is_file() {
                debug!(path = %path.display(), "reading decode-dimms dump");
                return match tokio::fs::read_to_string(path).await {
                    Ok(text) => {
                        let timings = parse_decode_dimms(&text);
                        if timings.is_empty() {
                            SourceOutcome::Unavailable
                        } else {
                            SourceOutcome::Yielded(timings)
                        }
                    }
                    Err(e) => SourceOutcome::Failed(format!("read {}: {}", path.display(), e)),
                };
            }
        }
        SourceOutcome::Unavailable
    }

    /// Search order: explicit configured path, then the well-known
    /// hardware-monitor report locations, then the startup override.
    fn locate_report(&self) -> Option<PathBuf> {
        if let Some(p) = &self.config.report_path {
            if p.is_file() {
                return Some(p.clone());
            }
        }
        let program_data = std::env::var_os("ProgramData")
            .unwrap_or_else(|| std::ffi::OsString::from(r"C:\ProgramData"));
        for (dir, file) in WELL_KNOWN_REPORTS {
            let candidate = Path::new(&program_data).join(dir).join(file);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if let Some(p) = &self.config.env_report_path {
            if p.is_file() {
                return Some(p.clone());
            }
        }
        None
    }
}

fn report_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)"(tCL|tRCD|tRP|tRAS|tRC|Voltage|DRAM Frequency|XMP Profile)"\s*:\s*"?([0-9][0-9.]*)"?"#,
        )
        .expect("spd report pattern")
    })
}

/// Scan a hardware-monitor report for the fixed timing field set. The file
/// must be valid JSON; matching runs over the re-serialized text so quoted
/// and bare numeric encodings of the same field line up. All hits fold into
/// a single record with lowercased snake_case keys.
pub(crate) fn parse_report_text(text: &str) -> Option<Vec<SpdTiming>> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let flat = serde_json::to_string(&value).ok()?;
    let mut record = SpdTiming::new();
    for caps in report_field_regex().captures_iter(&flat) {
        let key = caps[1].to_lowercase().replace(' ', "_");
        let raw = &caps[2];
        let value = match raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => serde_json::Value::Number(n),
            None => serde_json::Value::from(raw),
        };
        record.insert(key, value);
    }
    if record.is_empty() {
        None
    } else {
        Some(vec![record])
    }
}

/// Split decode-dimms text on blank lines into per-DIMM blocks and pick out
/// recognized timing lines. Values stay exactly as the tool printed them.
/// The tRCD test has to run before tRC; that key is a substring of it.
pub(crate) fn parse_decode_dimms(text: &str) -> Vec<SpdTiming> {
    let mut out = Vec::new();
    let mut current = SpdTiming::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let lower = key.trim().to_lowercase();
        let slot = if lower.contains("tcl") || lower.contains("cas latency") {
            "tcl"
        } else if lower.contains("trcd") {
            "trcd"
        } else if lower.contains("trp") {
            "trp"
        } else if lower.contains("tras") {
            "tras"
        } else if lower.contains("trc") {
            "trc"
        } else if lower.contains("voltage") {
            "voltage"
        } else if lower.contains("speed") {
            "speed"
        } else {
            continue;
        };
        current.insert(slot.to_string(), serde_json::Value::from(value));
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
