// Per-attempt result of querying one data source

/// Outcome of one best-effort probe of an external source. Union/merge
/// logic is driven by these values instead of caught failures; nothing
/// downstream treats any variant as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome<T> {
    /// The source produced data.
    Yielded(T),
    /// The source is missing on this host (tool not installed, interface
    /// absent, timeout). Resolved by omission.
    Unavailable,
    /// The source exists but the attempt failed; the reason is kept for
    /// debug logging only.
    Failed(String),
}

impl<T> SourceOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SourceOutcome<U> {
        match self {
            SourceOutcome::Yielded(v) => SourceOutcome::Yielded(f(v)),
            SourceOutcome::Unavailable => SourceOutcome::Unavailable,
            SourceOutcome::Failed(reason) => SourceOutcome::Failed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_transforms_only_yielded() {
        assert_eq!(SourceOutcome::Yielded(5).map(|v| v * 2), SourceOutcome::Yielded(10));
        assert_eq!(
            SourceOutcome::<u32>::Unavailable.map(|v| v * 2),
            SourceOutcome::Unavailable
        );
    }

    #[test]
    fn map_keeps_failure_reason() {
        let out: SourceOutcome<u32> = SourceOutcome::Failed("exit status 1".into());
        assert_eq!(
            out.map(|v| v * 2),
            SourceOutcome::Failed("exit status 1".into())
        );
    }
}
