use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Per-nesting-level dispatch counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub dispatches: u64,
    pub units_requested: u64,
    pub units_realized: u64,
    pub invocations: u64,
}

/// Dispatch statistics collected across a run
#[derive(Debug, Default)]
pub struct TeamStats {
    dispatches: AtomicU64,
    units_requested: AtomicU64,
    units_realized: AtomicU64,
    degraded_dispatches: AtomicU64,
    invocations: AtomicU64,
    peak_team_size: AtomicUsize,
    per_level: DashMap<usize, LevelStats>,
}

impl TeamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_dispatch(&self, level: usize, requested: usize, realized: usize) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.units_requested
            .fetch_add(requested as u64, Ordering::Relaxed);
        self.units_realized
            .fetch_add(realized as u64, Ordering::Relaxed);
        if realized < requested {
            self.degraded_dispatches.fetch_add(1, Ordering::Relaxed);
        }
        self.peak_team_size.fetch_max(realized, Ordering::Relaxed);

        let mut entry = self.per_level.entry(level).or_default();
        entry.dispatches += 1;
        entry.units_requested += requested as u64;
        entry.units_realized += realized as u64;
    }

    pub(crate) fn record_invocation(&self, level: usize) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.per_level.entry(level).or_default().invocations += 1;
    }

    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn degraded_dispatches(&self) -> u64 {
        self.degraded_dispatches.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> TeamStatsSnapshot {
        TeamStatsSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            units_requested: self.units_requested.load(Ordering::Relaxed),
            units_realized: self.units_realized.load(Ordering::Relaxed),
            degraded_dispatches: self.degraded_dispatches.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            peak_team_size: self.peak_team_size.load(Ordering::Relaxed),
            per_level: self
                .per_level
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }
}

/// Serializable view of [`TeamStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStatsSnapshot {
    pub dispatches: u64,
    pub units_requested: u64,
    pub units_realized: u64,
    pub degraded_dispatches: u64,
    pub invocations: u64,
    pub peak_team_size: usize,
    pub per_level: BTreeMap<usize, LevelStats>,
}

impl TeamStatsSnapshot {
    /// Fraction of requested units that were actually realized
    pub fn realization_ratio(&self) -> f64 {
        if self.units_requested == 0 {
            return 1.0;
        }
        self.units_realized as f64 / self.units_requested as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_dispatch_and_invocations() {
        let stats = TeamStats::new();
        stats.record_dispatch(1, 2, 2);
        stats.record_invocation(1);
        stats.record_invocation(1);
        stats.record_dispatch(2, 2, 1);
        stats.record_invocation(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.dispatches, 2);
        assert_eq!(snapshot.units_requested, 4);
        assert_eq!(snapshot.units_realized, 3);
        assert_eq!(snapshot.degraded_dispatches, 1);
        assert_eq!(snapshot.invocations, 3);
        assert_eq!(snapshot.peak_team_size, 2);
        assert_eq!(
            snapshot.per_level.get(&2),
            Some(&LevelStats {
                dispatches: 1,
                units_requested: 2,
                units_realized: 1,
                invocations: 1,
            })
        );
        assert!((snapshot.realization_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = TeamStats::new().snapshot();
        assert_eq!(snapshot, TeamStatsSnapshot::default());
        assert_eq!(snapshot.realization_ratio(), 1.0);
    }
}
