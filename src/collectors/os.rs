// OS identity and uptime

use std::sync::Arc;

use chrono::{Local, TimeZone};
use sysinfo::System;
use tracing::instrument;

use crate::models::OsFacts;

pub struct OsCollector {
    sys: Arc<std::sync::Mutex<System>>,
}

impl Default for OsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl OsCollector {
    pub fn new() -> Self {
        // Identity does not change over a process lifetime; one refresh at
        // construction is enough for the brand fallback below.
        let mut sys = System::new();
        sys.refresh_cpu_all();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
        }
    }

    #[instrument(skip(self), fields(collector = "os"))]
    pub async fn collect(&self) -> anyhow::Result<OsFacts> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let processor_string = sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| std::env::consts::ARCH.to_string());
            Ok(OsFacts {
                system: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
                node: System::host_name().unwrap_or_default(),
                release: System::kernel_version().unwrap_or_default(),
                version: System::long_os_version().unwrap_or_default(),
                machine: std::env::consts::ARCH.to_string(),
                processor_string,
                boot_time: format_boot_time(System::boot_time()),
                uptime_seconds: System::uptime(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("os collector task join: {}", e))?
    }
}

/// Local-time ISO-8601 with second precision, e.g. "2024-05-01T09:30:12".
fn format_boot_time(epoch_secs: u64) -> String {
    Local
        .timestamp_opt(epoch_secs as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_time_is_iso_seconds() {
        let s = format_boot_time(1_700_000_000);
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[10..11], "T");
    }

    #[tokio::test]
    async fn collect_populates_identity() {
        let facts = OsCollector::new().collect().await.unwrap();
        assert!(!facts.system.is_empty());
        assert!(!facts.machine.is_empty());
        assert!(!facts.processor_string.is_empty());
    }
}
