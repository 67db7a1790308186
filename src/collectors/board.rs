// Motherboard and BIOS identity via the platform backend

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, instrument};

use crate::collectors::SourceOutcome;
use crate::models::MotherboardBiosFacts;
use crate::platform::BoardBackend;

pub struct BoardCollector {
    backend: Arc<dyn BoardBackend>,
}

impl BoardCollector {
    pub fn new(backend: Box<dyn BoardBackend>) -> Self {
        Self {
            backend: Arc::from(backend),
        }
    }

    /// An empty section is a valid result; board identity is simply not
    /// readable on every host.
    #[instrument(skip(self), fields(collector = "board"))]
    pub async fn collect(&self) -> MotherboardBiosFacts {
        match self.backend.board_facts().await {
            SourceOutcome::Yielded(facts) => facts,
            SourceOutcome::Unavailable => MotherboardBiosFacts::default(),
            SourceOutcome::Failed(reason) => {
                debug!(reason = %reason, "board backend failed");
                MotherboardBiosFacts::default()
            }
        }
    }
}

/// Packed management-interface timestamp (`YYYYMMDDHHMMSS.ffffff+UUU`) to
/// ISO-8601 seconds. Callers pass the raw string through when this fails.
pub fn normalize_wmi_release_date(raw: &str) -> Option<String> {
    let stamp = raw.get(..14)?;
    let parsed = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;
    Some(parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// DMI `bios_date` (`MM/DD/YYYY`) to `YYYY-MM-DD`.
pub fn normalize_dmi_date(raw: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y").ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_release_date_normalizes() {
        assert_eq!(
            normalize_wmi_release_date("20230401000000.000000+180").as_deref(),
            Some("2023-04-01T00:00:00")
        );
        assert_eq!(
            normalize_wmi_release_date("20191231235959").as_deref(),
            Some("2019-12-31T23:59:59")
        );
    }

    #[test]
    fn malformed_release_date_stays_raw() {
        assert_eq!(normalize_wmi_release_date("04/01/2023"), None);
        assert_eq!(normalize_wmi_release_date("2023"), None);
        assert_eq!(normalize_wmi_release_date("2023040100000x"), None);
        // Month 13 is out of range.
        assert_eq!(normalize_wmi_release_date("20231301000000"), None);
    }

    #[test]
    fn dmi_date_normalizes() {
        assert_eq!(normalize_dmi_date("04/01/2023").as_deref(), Some("2023-04-01"));
        assert_eq!(normalize_dmi_date(" 12/31/2019 ").as_deref(), Some("2019-12-31"));
        assert_eq!(normalize_dmi_date("2023-04-01"), None);
        assert_eq!(normalize_dmi_date("garbage"), None);
    }

    #[tokio::test]
    async fn collect_never_fails() {
        let collector = BoardCollector::new(crate::platform::board_backend());
        // Whatever the host offers, an empty section is acceptable.
        let _ = collector.collect().await;
    }
}
