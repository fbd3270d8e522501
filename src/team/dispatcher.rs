use crate::core::errors::{Result, TeamError};
use crate::core::limits::TeamLimits;
use crate::team::level::{current_level, LevelGuard};
use crate::team::stats::TeamStats;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

/// A request to run work on a team of `size` units with `stack_budget` bytes of stack each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRequest {
    size: NonZeroUsize,
    stack_budget: usize,
}

impl TeamRequest {
    pub fn new(size: usize, stack_budget: usize) -> Result<Self> {
        let size = NonZeroUsize::new(size)
            .ok_or_else(|| TeamError::validation_field("team size must be at least 1", "size"))?;
        if stack_budget == 0 {
            return Err(TeamError::validation_field(
                "stack budget must be greater than 0",
                "stack_budget",
            ));
        }
        Ok(Self { size, stack_budget })
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    pub fn stack_budget(&self) -> usize {
        self.stack_budget
    }
}

/// Outcome of a dispatch: how many units actually ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedTeam {
    pub requested: usize,
    pub realized: usize,
    pub level: usize,
}

impl RealizedTeam {
    pub fn is_degraded(&self) -> bool {
        self.realized < self.requested
    }
}

/// What a unit knows about its place in the team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitContext {
    /// Unit number within the team; 0 is the dispatching thread
    pub index: usize,
    /// Number of units realized for the team
    pub team_size: usize,
    /// Nesting level of the team, starting at 1 for the outermost dispatch
    pub level: usize,
}

/// Fork-join dispatcher running work on thread teams under a per-unit stack budget.
///
/// The dispatching thread always takes part as unit 0, so a team never has zero
/// units. Additional units are scoped threads spawned with the request's stack
/// budget. When the budget is too small, the nesting level too deep, or the OS
/// refuses a thread, the team silently shrinks; the work still runs on every
/// realized unit before `dispatch` returns.
#[derive(Debug)]
pub struct Dispatcher {
    limits: TeamLimits,
    stats: TeamStats,
}

impl Dispatcher {
    pub fn new(limits: TeamLimits) -> Result<Self> {
        limits.validate()?;
        if !limits.can_spawn_units() {
            debug!(
                "Stack budget {}B cannot host a spawned unit, teams will run on the caller only",
                limits.stack_size_bytes
            );
        }
        Ok(Self {
            limits,
            stats: TeamStats::new(),
        })
    }

    pub fn limits(&self) -> &TeamLimits {
        &self.limits
    }

    pub fn stats(&self) -> &TeamStats {
        &self.stats
    }

    /// Build a request for `size` units using the run's configured stack budget
    pub fn request(&self, size: usize) -> Result<TeamRequest> {
        TeamRequest::new(size, self.limits.stack_size_bytes)
    }

    /// Run `work` once on every unit of a team and wait for all of them.
    ///
    /// Realizes between 1 and `request.size()` units. Panics raised by any unit
    /// are propagated to the caller after the team has been joined.
    pub fn dispatch<F>(&self, request: &TeamRequest, work: F) -> RealizedTeam
    where
        F: Fn(&UnitContext) + Sync,
    {
        let level = current_level() + 1;
        let capacity = self
            .limits
            .team_capacity(request.size(), request.stack_budget(), level);
        let work = &work;

        let realized = thread::scope(|scope| {
            let mut members = Vec::with_capacity(capacity - 1);
            for index in 1..capacity {
                let (team_size_tx, team_size_rx) = mpsc::sync_channel::<usize>(1);
                let spawned = thread::Builder::new()
                    .name(format!("team-l{}-u{}", level, index))
                    .stack_size(request.stack_budget())
                    .spawn_scoped(scope, move || {
                        // Blocks until the dispatcher knows how many units it got
                        if let Ok(team_size) = team_size_rx.recv() {
                            self.run_unit(
                                UnitContext {
                                    index,
                                    team_size,
                                    level,
                                },
                                work,
                            );
                        }
                    });
                match spawned {
                    Ok(_) => members.push(team_size_tx),
                    Err(e) => {
                        warn!(
                            "Failed to spawn unit {} at level {}: {}; continuing with {} units",
                            index,
                            level,
                            e,
                            members.len() + 1
                        );
                        break;
                    }
                }
            }

            let team_size = members.len() + 1;
            for member in &members {
                if member.send(team_size).is_err() {
                    warn!("Unit at level {} exited before the team started", level);
                }
            }
            self.run_unit(
                UnitContext {
                    index: 0,
                    team_size,
                    level,
                },
                work,
            );
            team_size
        });

        self.stats.record_dispatch(level, request.size(), realized);
        let team = RealizedTeam {
            requested: request.size(),
            realized,
            level,
        };
        if team.is_degraded() {
            debug!(
                "Team at level {} degraded: requested {}, realized {}",
                level, team.requested, team.realized
            );
        } else {
            debug!("Team at level {} joined with {} units", level, realized);
        }
        team
    }

    /// Convenience wrapper building the request from the configured stack budget
    pub fn run<F>(&self, size: usize, work: F) -> Result<RealizedTeam>
    where
        F: Fn(&UnitContext) + Sync,
    {
        let request = self.request(size)?;
        Ok(self.dispatch(&request, work))
    }

    fn run_unit<F>(&self, ctx: UnitContext, work: &F)
    where
        F: Fn(&UnitContext) + Sync,
    {
        let _level = LevelGuard::enter(ctx.level);
        debug!(
            "Unit {}/{} running at level {}",
            ctx.index, ctx.team_size, ctx.level
        );
        work(&ctx);
        self.stats.record_invocation(ctx.level);
    }
}
