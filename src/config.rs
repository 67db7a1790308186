use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gather: GatherConfig,
    pub spd: SpdConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatherConfig {
    /// Seconds between full snapshots in watch mode.
    pub interval_secs: u64,
    /// Seconds between GPU-only refreshes in watch mode.
    pub gpu_interval_secs: u64,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            gpu_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpdConfig {
    /// Explicit path to a LibreHardwareMonitor/OpenHardwareMonitor report,
    /// checked before the well-known locations.
    pub report_path: Option<PathBuf>,
    /// Path to a decode-dimms(1) text dump, used only when no report exists.
    pub decode_dimms_path: Option<PathBuf>,
    /// Report path taken from the environment at startup, checked after
    /// the well-known locations. Never read from the config file.
    #[serde(skip)]
    pub env_report_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from an explicit path, or from `config.toml` in the working
    /// directory when none was given. The explicit path must exist; the
    /// default one may be absent, in which case defaults apply.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("reading config {}: {}", p.display(), e))?;
                Self::load_from_str(&s)
            }
            None => match std::fs::read_to_string(DEFAULT_CONFIG_FILE) {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.gather.interval_secs > 0,
            "gather.interval_secs must be > 0, got {}",
            self.gather.interval_secs
        );
        anyhow::ensure!(
            self.gather.gpu_interval_secs > 0,
            "gather.gpu_interval_secs must be > 0, got {}",
            self.gather.gpu_interval_secs
        );
        Ok(())
    }
}
