use crate::core::config::ProbeConfig;
use crate::core::errors::{Result, TeamError};
use crate::core::limits::TeamLimits;
use crate::counter::SharedCounter;
use crate::offload::OffloadBackend;
use crate::team::{Dispatcher, RealizedTeam, TeamStatsSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

/// Closed range of acceptable final counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioBounds {
    pub min: i64,
    pub max: i64,
}

impl ScenarioBounds {
    /// Bounds for the nested scenario with every dispatch requesting `team_size` units.
    ///
    /// Fully degraded: one increment from the first team plus one from the single
    /// nested team. Fully realized: `n` from the first team plus `n * n` nested.
    /// The maximum saturates at `i64::MAX`.
    pub fn for_team_size(team_size: usize) -> Self {
        let max = i64::try_from(team_size)
            .ok()
            .and_then(|n| n.checked_mul(n).and_then(|square| square.checked_add(n)))
            .unwrap_or(i64::MAX);
        Self { min: 2, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Realized team sizes recorded while running the scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// The team incrementing directly from the outer invocation
    pub first: RealizedTeam,
    /// The team whose units each dispatch a nested incrementing team
    pub outer: RealizedTeam,
    /// One entry per nested incrementing team
    pub inner: Vec<RealizedTeam>,
}

impl ScenarioOutcome {
    /// Increments the counter must show if no update was lost
    pub fn expected_increments(&self) -> i64 {
        let nested: usize = self.inner.iter().map(|team| team.realized).sum();
        (self.first.realized + nested) as i64
    }

    pub fn is_degraded(&self) -> bool {
        self.first.is_degraded()
            || self.outer.is_degraded()
            || self.inner.iter().any(RealizedTeam::is_degraded)
    }
}

/// Run the nested increment scenario against `counter`.
///
/// First a team increments the counter directly, then a team whose units each
/// dispatch an incrementing team of their own.
pub fn run_scenario(
    dispatcher: &Dispatcher,
    counter: &SharedCounter,
    team_size: usize,
) -> Result<ScenarioOutcome> {
    let request = dispatcher.request(team_size)?;

    let first = dispatcher.dispatch(&request, |_| {
        counter.increment();
    });
    info!(
        "Direct team realized {}/{} units, counter at {}",
        first.realized,
        first.requested,
        counter.get()
    );

    let inner = Mutex::new(Vec::new());
    let outer = dispatcher.dispatch(&request, |_| {
        let nested = dispatcher.dispatch(&request, |_| {
            counter.increment();
        });
        inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(nested);
    });
    let inner = inner.into_inner().unwrap_or_else(PoisonError::into_inner);
    info!(
        "Nesting team realized {}/{} units with nested sizes {:?}, counter at {}",
        outer.realized,
        outer.requested,
        inner.iter().map(|team| team.realized).collect::<Vec<_>>(),
        counter.get()
    );

    Ok(ScenarioOutcome {
        first,
        outer,
        inner,
    })
}

/// Check the final counter value: first the black-box bound, then exact agreement
/// with the number of increments that the realized teams performed.
pub fn verify(observed: i64, bounds: ScenarioBounds, expected: i64) -> Result<()> {
    if !bounds.contains(observed) {
        return Err(TeamError::bound_violation(observed, bounds.min, bounds.max));
    }
    if observed != expected {
        return Err(TeamError::lost_updates(expected, observed));
    }
    Ok(())
}

/// Everything observed during one probe run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub backend: String,
    pub limits: TeamLimits,
    pub team_size: usize,
    pub bounds: ScenarioBounds,
    pub outcome: ScenarioOutcome,
    pub expected: i64,
    pub observed: i64,
    pub degraded: bool,
    pub stats: TeamStatsSnapshot,
}

impl ProbeReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Map a zeroed counter through `backend`, run the scenario inside the region and
/// verify the value copied back to the host.
pub async fn run_probe<B: OffloadBackend>(
    config: &ProbeConfig,
    backend: &B,
) -> Result<ProbeReport> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let team_size = config.team_size;
    let bounds = ScenarioBounds::for_team_size(team_size);
    let dispatcher = Arc::new(Dispatcher::new(config.limits.clone())?);

    info!(
        "Probe {} starting on {} backend: team_size={} stack={}B bounds=[{}, {}]",
        run_id,
        backend.name(),
        team_size,
        config.limits.stack_size_bytes,
        bounds.min,
        bounds.max
    );

    let mut host: i64 = 0;
    let region_dispatcher = Arc::clone(&dispatcher);
    let outcome = backend
        .map_tofrom(&mut host, move |device| {
            run_scenario(&region_dispatcher, device, team_size)
        })
        .await?;

    let expected = outcome.expected_increments();
    let degraded = outcome.is_degraded();
    let stats = dispatcher.stats().snapshot();
    if degraded {
        warn!(
            "Probe {} ran with degraded parallelism ({} of {} requested units realized, ratio {:.2})",
            run_id,
            stats.units_realized,
            stats.units_requested,
            stats.realization_ratio()
        );
    }

    verify(host, bounds, expected)?;
    info!(
        "Probe {} passed: counter {} within [{}, {}]",
        run_id, host, bounds.min, bounds.max
    );

    Ok(ProbeReport {
        run_id,
        started_at,
        backend: backend.name().to_string(),
        limits: config.limits.clone(),
        team_size,
        bounds,
        outcome,
        expected,
        observed: host,
        degraded,
        stats,
    })
}
