// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
    pub mod limits;
}

pub mod counter; // Atomic shared counter cell
pub mod offload; // Scalar mapping into the execution domain
pub mod probe; // Nested increment scenario and its verification
pub mod team; // Fork-join thread-team dispatch

// Re-exports for convenience
pub use crate::core::config::ProbeConfig;
pub use crate::core::errors::{Result, TeamError};
pub use crate::core::limits::TeamLimits;
pub use counter::SharedCounter;
pub use offload::{HostBackend, OffloadBackend};
pub use probe::{run_probe, run_scenario, verify, ProbeReport, ScenarioBounds, ScenarioOutcome};
pub use team::{Dispatcher, RealizedTeam, TeamRequest, TeamStats, UnitContext};
