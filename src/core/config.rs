use crate::core::errors::{Result, TeamError};
use crate::core::limits::{parse_byte_size, TeamLimits};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "TEAM_PROBE_CONFIG";
pub const STACK_SIZE_ENV: &str = "TEAM_PROBE_STACK_SIZE";
pub const THREAD_LIMIT_ENV: &str = "TEAM_PROBE_THREAD_LIMIT";
pub const MAX_ACTIVE_LEVELS_ENV: &str = "TEAM_PROBE_MAX_ACTIVE_LEVELS";
pub const TEAM_SIZE_ENV: &str = "TEAM_PROBE_TEAM_SIZE";

/// Probe run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Limits shared by every dispatch in the run
    pub limits: TeamLimits,
    /// Units requested by each dispatch of the scenario
    pub team_size: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            limits: TeamLimits::default(),
            team_size: 2,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        if self.team_size == 0 {
            return Err(TeamError::configuration(
                "team_size must be greater than 0",
            ));
        }
        if self.team_size > self.limits.thread_limit {
            return Err(TeamError::configuration(format!(
                "team_size {} exceeds thread_limit {}",
                self.team_size, self.limits.thread_limit
            )));
        }
        Ok(())
    }

    /// Load configuration from a YAML file; missing keys take their defaults
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TeamError::io(format!("read config {}", path.display()), e))?;
        let config: ProbeConfig = serde_yaml::from_str(&raw)?;
        debug!("Loaded probe config from {}", path.display());
        Ok(config)
    }

    /// Defaults, then the YAML file named by `TEAM_PROBE_CONFIG`, then individual env overrides
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProbeConfig::from_env`] with an injectable variable source
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        info!(
            "Probe config: stack={}B thread_limit={} max_active_levels={} team_size={}",
            config.limits.stack_size_bytes,
            config.limits.thread_limit,
            config.limits.max_active_levels,
            config.team_size
        );
        Ok(config)
    }

    fn apply_overrides<L>(&mut self, lookup: &L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(STACK_SIZE_ENV) {
            self.limits.stack_size_bytes = parse_byte_size(&raw).ok_or_else(|| {
                TeamError::configuration_field(
                    STACK_SIZE_ENV,
                    "byte count such as 2048 or 64K",
                    &raw,
                )
            })?;
        }
        if let Some(raw) = lookup(THREAD_LIMIT_ENV) {
            self.limits.thread_limit = parse_count(THREAD_LIMIT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MAX_ACTIVE_LEVELS_ENV) {
            self.limits.max_active_levels = parse_count(MAX_ACTIVE_LEVELS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(TEAM_SIZE_ENV) {
            self.team_size = parse_count(TEAM_SIZE_ENV, &raw)?;
        }
        Ok(())
    }
}

fn parse_count(field: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| TeamError::configuration_field(field, "positive integer", raw))
}
