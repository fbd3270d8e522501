//! Integration tests for nested team dispatch and the increment probe
//!
//! These exercise the public API end to end: degradable dispatch, atomic
//! increments across nested teams, and the bounded scenario run through the
//! host offload backend.

use anyhow::Result;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use team_probe::{
    run_probe, run_scenario, Dispatcher, HostBackend, ProbeConfig, ScenarioBounds, SharedCounter,
    TeamError, TeamLimits, TeamRequest,
};

const STACK_BUDGETS: [usize; 6] = [
    1,
    2048,
    32 * 1024,
    64 * 1024,
    256 * 1024,
    2 * 1024 * 1024,
];

fn limits_with_budget(stack_size_bytes: usize) -> TeamLimits {
    TeamLimits {
        stack_size_bytes,
        ..TeamLimits::default()
    }
}

/// The scenario stays within [2, 6] for every stack budget
#[test]
fn test_scenario_bounded_for_all_budgets() -> Result<()> {
    let bounds = ScenarioBounds::for_team_size(2);
    for budget in STACK_BUDGETS {
        let dispatcher = Dispatcher::new(limits_with_budget(budget))?;
        let counter = SharedCounter::new(0);
        let outcome = run_scenario(&dispatcher, &counter, 2)?;
        let value = counter.get();
        assert!(
            bounds.contains(value),
            "budget {} produced out-of-bound value {}",
            budget,
            value
        );
        assert_eq!(value, outcome.expected_increments());
    }
    Ok(())
}

/// Budgets below the unit minimum serialize every team
#[test]
fn test_scenario_fully_degraded_is_minimum() -> Result<()> {
    let dispatcher = Dispatcher::new(limits_with_budget(2048))?;
    let counter = SharedCounter::new(0);
    let outcome = run_scenario(&dispatcher, &counter, 2)?;
    assert_eq!(counter.get(), 2);
    assert_eq!(outcome.first.realized, 1);
    assert_eq!(outcome.outer.realized, 1);
    assert_eq!(outcome.inner.len(), 1);
    assert_eq!(dispatcher.stats().degraded_dispatches(), 3);
    Ok(())
}

/// Realized size stays within [1, requested] and work runs exactly that many times
#[test]
fn test_realized_team_within_request() -> Result<()> {
    let dispatcher = Dispatcher::new(limits_with_budget(256 * 1024))?;
    for _ in 0..32 {
        let requested = fastrand::usize(1..=16);
        let invocations = AtomicUsize::new(0);
        let team = dispatcher.run(requested, |_| {
            invocations.fetch_add(1, Ordering::SeqCst);
        })?;
        assert!(team.realized >= 1);
        assert!(team.realized <= requested);
        assert_eq!(invocations.load(Ordering::SeqCst), team.realized);
    }
    Ok(())
}

/// A team of N incrementing units leaves exactly N on a fresh counter
#[test]
fn test_team_increments_are_atomic() -> Result<()> {
    let dispatcher = Dispatcher::new(limits_with_budget(256 * 1024))?;
    for requested in [1, 2, 7, 16, 33, 64] {
        let counter = SharedCounter::new(0);
        let team = dispatcher.run(requested, |_| {
            for _ in 0..fastrand::usize(0..8) {
                std::thread::yield_now();
            }
            counter.increment();
        })?;
        assert_eq!(counter.get(), team.realized as i64);
    }
    Ok(())
}

/// Requesting two units with a stack too small for a spawned unit still runs the work once
#[test]
fn test_degradation_never_drops_to_zero() -> Result<()> {
    let dispatcher = Dispatcher::new(limits_with_budget(2048))?;
    let request = TeamRequest::new(2, 2048)?;
    let counter = SharedCounter::new(0);
    let team = dispatcher.dispatch(&request, |ctx| {
        assert_eq!(ctx.team_size, 1);
        counter.increment();
    });
    assert_eq!(team.realized, 1);
    assert!(team.is_degraded());
    assert_eq!(counter.get(), 1);
    Ok(())
}

/// Teams nest to arbitrary depth and every leaf increment is accounted for
#[test]
fn test_three_level_nesting() -> Result<()> {
    let dispatcher = Dispatcher::new(limits_with_budget(256 * 1024))?;
    let request = dispatcher.request(2)?;
    let counter = SharedCounter::new(0);
    let leaves = AtomicUsize::new(0);
    dispatcher.dispatch(&request, |_| {
        dispatcher.dispatch(&request, |_| {
            let team = dispatcher.dispatch(&request, |ctx| {
                assert_eq!(ctx.level, 3);
                counter.increment();
            });
            leaves.fetch_add(team.realized, Ordering::SeqCst);
        });
    });
    let value = counter.get();
    assert_eq!(value, leaves.load(Ordering::SeqCst) as i64);
    assert!((1..=8).contains(&value));
    Ok(())
}

#[test]
fn test_zero_sized_request_is_rejected() {
    let err = TeamRequest::new(0, 4096).unwrap_err();
    assert!(matches!(err, TeamError::Validation { .. }));
}

#[tokio::test]
async fn test_probe_through_host_backend() -> Result<()> {
    let report = run_probe(&ProbeConfig::default(), &HostBackend::new()).await?;
    assert!(report.bounds.contains(report.observed));
    assert_eq!(report.observed, report.expected);
    assert_eq!(report.bounds, ScenarioBounds { min: 2, max: 6 });
    Ok(())
}

#[tokio::test]
async fn test_probe_with_tiny_stack_reports_degradation() -> Result<()> {
    let config = ProbeConfig {
        limits: TeamLimits::conservative(),
        team_size: 2,
    };
    let report = run_probe(&config, &HostBackend::new()).await?;
    assert_eq!(report.observed, 2);
    assert!(report.degraded);
    assert_eq!(report.stats.degraded_dispatches, 3);
    Ok(())
}

#[tokio::test]
async fn test_probe_larger_team_bounds() -> Result<()> {
    let config = ProbeConfig {
        limits: limits_with_budget(256 * 1024),
        team_size: 3,
    };
    let report = run_probe(&config, &HostBackend::new()).await?;
    assert_eq!(report.bounds, ScenarioBounds { min: 2, max: 12 });
    assert!(report.bounds.contains(report.observed));
    Ok(())
}
