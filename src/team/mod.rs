// Fork-join thread teams with degradable parallelism

pub mod dispatcher;
pub mod level;
pub mod stats;

pub use dispatcher::{Dispatcher, RealizedTeam, TeamRequest, UnitContext};
pub use level::current_level;
pub use stats::{LevelStats, TeamStats, TeamStatsSnapshot};
