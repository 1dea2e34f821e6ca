//! Observability hooks for resolution.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// How a single source probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeOutcome {
    Found,
    /// Not present, including "not indexed".
    Absent,
    /// The identifier could not be mapped onto the source.
    Rejected,
    Unavailable,
    /// Data-integrity failure in the archive; worth alerting on.
    Corrupt,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeOutcome::Found => "found",
            ProbeOutcome::Absent => "absent",
            ProbeOutcome::Rejected => "rejected",
            ProbeOutcome::Unavailable => "unavailable",
            ProbeOutcome::Corrupt => "corrupt",
        };
        f.write_str(name)
    }
}

/// Injected into the resolver; the process entry point owns its lifecycle.
pub trait ResolveObserver: Send + Sync {
    fn probe(&self, source: &str, outcome: ProbeOutcome);

    fn finished(&self, _found: bool) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ResolveObserver for NoopObserver {
    fn probe(&self, _source: &str, _outcome: ProbeOutcome) {}
}

/// Process-wide counters, safe to share across concurrent resolutions.
#[derive(Debug, Default)]
pub struct ResolveCounters {
    found: AtomicU64,
    absent: AtomicU64,
    rejected: AtomicU64,
    unavailable: AtomicU64,
    corrupt: AtomicU64,
    bodies_found: AtomicU64,
    bodies_not_found: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub found: u64,
    pub absent: u64,
    pub rejected: u64,
    pub unavailable: u64,
    pub corrupt: u64,
    pub bodies_found: u64,
    pub bodies_not_found: u64,
}

impl ResolveCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            found: self.found.load(Ordering::Relaxed),
            absent: self.absent.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            bodies_found: self.bodies_found.load(Ordering::Relaxed),
            bodies_not_found: self.bodies_not_found.load(Ordering::Relaxed),
        }
    }

    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Bodies found: {}, Not found: {}, Probes: {} found / {} absent / {} rejected / {} unavailable / {} corrupt",
            s.bodies_found, s.bodies_not_found, s.found, s.absent, s.rejected, s.unavailable, s.corrupt
        )
    }
}

impl ResolveObserver for ResolveCounters {
    fn probe(&self, _source: &str, outcome: ProbeOutcome) {
        let counter = match outcome {
            ProbeOutcome::Found => &self.found,
            ProbeOutcome::Absent => &self.absent,
            ProbeOutcome::Rejected => &self.rejected,
            ProbeOutcome::Unavailable => &self.unavailable,
            ProbeOutcome::Corrupt => &self.corrupt,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn finished(&self, found: bool) {
        let counter = if found {
            &self.bodies_found
        } else {
            &self.bodies_not_found
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_is_counted_apart_from_absent() {
        let counters = ResolveCounters::new();
        counters.probe("archive", ProbeOutcome::Corrupt);
        counters.probe("spool", ProbeOutcome::Absent);
        counters.probe("peer:a", ProbeOutcome::Absent);
        counters.finished(false);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.corrupt, 1);
        assert_eq!(snapshot.absent, 2);
        assert_eq!(snapshot.bodies_not_found, 1);
        assert_eq!(snapshot.bodies_found, 0);
    }

    #[test]
    fn summary_mentions_every_counter() {
        let counters = ResolveCounters::new();
        counters.probe("archive", ProbeOutcome::Found);
        counters.finished(true);
        let summary = counters.summary();
        assert!(summary.starts_with("Bodies found: 1, Not found: 0"));
        assert!(summary.contains("1 found"));
    }
}
