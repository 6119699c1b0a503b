//! Allocation run configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding [`AllocatorConfig::min_buffer_minutes`].
pub const ENV_MIN_BUFFER_MINUTES: &str = "ALLOCATOR_MIN_BUFFER_MINUTES";
/// Environment variable overriding [`AllocatorConfig::strategy`].
pub const ENV_STRATEGY: &str = "ALLOCATOR_STRATEGY";
/// Environment variable overriding [`AllocatorConfig::proposer_timeout_ms`].
pub const ENV_PROPOSER_TIMEOUT_MS: &str = "ALLOCATOR_PROPOSER_TIMEOUT_MS";

/// Largest accepted buffer: one day.
pub const MAX_BUFFER_MINUTES: i64 = 24 * 60;

/// How eagerly proposers should fill drivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStrategy {
    /// Keep drivers mostly in their preferred region.
    #[default]
    Conservative,
    /// Maximize allocation rate; cross-region work is acceptable.
    Aggressive,
}

impl FromStr for ProposalStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(ProposalStrategy::Conservative),
            "aggressive" => Ok(ProposalStrategy::Aggressive),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_STRATEGY.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProposalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProposalStrategy::Conservative => "conservative",
            ProposalStrategy::Aggressive => "aggressive",
        })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("{field} out of range: {message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },
}

/// Configuration for an allocation run.
///
/// # Examples
///
/// ```
/// use crew_alloc::config::{AllocatorConfig, ProposalStrategy};
///
/// let config = AllocatorConfig::default()
///     .with_min_buffer_minutes(20)
///     .with_strategy(ProposalStrategy::Aggressive)
///     .with_proposer_timeout_ms(5_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Minimum idle minutes between two orders of one driver.
    pub min_buffer_minutes: i64,

    /// Hint passed to proposers.
    pub strategy: ProposalStrategy,

    /// Per-stage proposer time limit. `None` = unlimited.
    pub proposer_timeout_ms: Option<u64>,

    /// Out-of-region share (0..1] above which a driver gets a warning.
    pub region_mismatch_ratio: f64,

    /// Orders per preferred driver above which a region is flagged.
    pub overloaded_region_ratio: f64,

    /// Evening orders per driver above which an info note is raised.
    pub evening_load_ratio: f64,

    /// Log individual feasibility rejections at info level.
    pub log_rejections: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            min_buffer_minutes: 15,
            strategy: ProposalStrategy::default(),
            proposer_timeout_ms: None,
            region_mismatch_ratio: 0.5,
            overloaded_region_ratio: 6.0,
            evening_load_ratio: 0.7,
            log_rejections: false,
        }
    }
}

impl AllocatorConfig {
    pub fn with_min_buffer_minutes(mut self, minutes: i64) -> Self {
        self.min_buffer_minutes = minutes;
        self
    }

    pub fn with_strategy(mut self, strategy: ProposalStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_proposer_timeout_ms(mut self, ms: u64) -> Self {
        self.proposer_timeout_ms = Some(ms);
        self
    }

    pub fn with_region_mismatch_ratio(mut self, ratio: f64) -> Self {
        self.region_mismatch_ratio = ratio;
        self
    }

    pub fn with_overloaded_region_ratio(mut self, ratio: f64) -> Self {
        self.overloaded_region_ratio = ratio;
        self
    }

    pub fn with_evening_load_ratio(mut self, ratio: f64) -> Self {
        self.evening_load_ratio = ratio;
        self
    }

    pub fn with_log_rejections(mut self, enabled: bool) -> Self {
        self.log_rejections = enabled;
        self
    }

    /// Proposer time limit as a [`Duration`].
    pub fn proposer_timeout(&self) -> Option<Duration> {
        self.proposer_timeout_ms.map(Duration::from_millis)
    }

    /// Checks field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_BUFFER_MINUTES).contains(&self.min_buffer_minutes) {
            return Err(ConfigError::OutOfRange {
                field: "min_buffer_minutes",
                message: format!("{} not in [0, {MAX_BUFFER_MINUTES}]", self.min_buffer_minutes),
            });
        }
        if !(self.region_mismatch_ratio > 0.0 && self.region_mismatch_ratio <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "region_mismatch_ratio",
                message: format!("{} not in (0, 1]", self.region_mismatch_ratio),
            });
        }
        for (field, value) in [
            ("overloaded_region_ratio", self.overloaded_region_ratio),
            ("evening_load_ratio", self.evening_load_ratio),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::OutOfRange {
                    field,
                    message: format!("{value} must be positive"),
                });
            }
        }
        Ok(())
    }

    /// Defaults overlaid with the `ALLOCATOR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MIN_BUFFER_MINUTES) {
            config.min_buffer_minutes = parse_value(ENV_MIN_BUFFER_MINUTES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_STRATEGY) {
            config.strategy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_PROPOSER_TIMEOUT_MS) {
            config.proposer_timeout_ms = Some(parse_value(ENV_PROPOSER_TIMEOUT_MS, &raw)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
