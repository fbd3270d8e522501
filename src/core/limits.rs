use crate::core::errors::{Result, TeamError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest stack a spawned unit is allowed to run on.
pub const DEFAULT_MIN_UNIT_STACK_BYTES: usize = 64 * 1024;

/// Upper bound accepted for `thread_limit`.
pub const MAX_THREAD_LIMIT: usize = 4096;

/// Resource limits applied uniformly to every dispatch in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamLimits {
    /// Stack budget of each spawned unit, in bytes
    pub stack_size_bytes: usize,
    /// Budget below which no unit can be spawned and teams run on the caller alone
    pub min_unit_stack_bytes: usize,
    /// Maximum number of units in any single team
    pub thread_limit: usize,
    /// Deepest nesting level that may run with more than one unit
    pub max_active_levels: usize,
}

impl Default for TeamLimits {
    fn default() -> Self {
        Self {
            stack_size_bytes: 2 * 1024 * 1024, // 2MB
            min_unit_stack_bytes: DEFAULT_MIN_UNIT_STACK_BYTES,
            thread_limit: 64,
            max_active_levels: 8,
        }
    }
}

impl TeamLimits {
    pub fn validate(&self) -> Result<()> {
        if self.stack_size_bytes == 0 {
            return Err(TeamError::configuration(
                "stack_size_bytes must be greater than 0",
            ));
        }
        if self.min_unit_stack_bytes == 0 {
            return Err(TeamError::configuration(
                "min_unit_stack_bytes must be greater than 0",
            ));
        }
        if self.thread_limit == 0 {
            return Err(TeamError::configuration(
                "thread_limit must be greater than 0",
            ));
        }
        if self.thread_limit > MAX_THREAD_LIMIT {
            return Err(TeamError::configuration(format!(
                "thread_limit must be at most {}, got {}",
                MAX_THREAD_LIMIT, self.thread_limit
            )));
        }
        if self.max_active_levels == 0 {
            return Err(TeamError::configuration(
                "max_active_levels must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Limits mirroring a tiny device stack: every team degrades to one unit
    pub fn conservative() -> Self {
        Self {
            stack_size_bytes: 2048,
            min_unit_stack_bytes: DEFAULT_MIN_UNIT_STACK_BYTES,
            thread_limit: 4,
            max_active_levels: 1,
        }
    }

    /// Limits for hosts with plenty of memory and cores
    pub fn aggressive() -> Self {
        Self {
            stack_size_bytes: 8 * 1024 * 1024, // 8MB
            min_unit_stack_bytes: DEFAULT_MIN_UNIT_STACK_BYTES,
            thread_limit: 256,
            max_active_levels: 16,
        }
    }

    /// Whether the stack budget can host a spawned unit at all
    pub fn can_spawn_units(&self) -> bool {
        self.stack_size_bytes >= self.min_unit_stack_bytes
    }

    /// Largest team a dispatch at `level` may realize for a request of `requested` units
    /// whose spawned units get `stack_budget` bytes each.
    ///
    /// Levels are 1-based: the outermost dispatch runs at level 1.
    pub fn team_capacity(&self, requested: usize, stack_budget: usize, level: usize) -> usize {
        let capacity = if stack_budget < self.min_unit_stack_bytes {
            debug!(
                "Stack budget {} below unit minimum {}, serializing team",
                stack_budget, self.min_unit_stack_bytes
            );
            1
        } else if level > self.max_active_levels {
            debug!(
                "Nesting level {} beyond max active levels {}, serializing team",
                level, self.max_active_levels
            );
            1
        } else {
            requested.min(self.thread_limit)
        };
        capacity.max(1)
    }
}

/// Parse a byte count such as `2048`, `64K`, `64KiB` or `2M`.
pub fn parse_byte_size(raw: &str) -> Option<usize> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    let value: usize = digits.parse().ok()?;
    let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        _ => return None,
    };
    value.checked_mul(multiplier)
}
