//! Serializable simulation configuration.
//!
//! Loaded from TOML; every key except the date range has a default:
//!
//! ```toml
//! start_date = "2024-01-02"
//! end_date = "2024-03-29"
//! lookback_period = 60
//! p_value_threshold = 0.05
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use pairlab_core::stats::MIN_OBSERVATIONS;

pub use pairlab_core::screen::DEFAULT_P_VALUE_THRESHOLD;
pub use pairlab_core::spread::DEFAULT_ZSCORE_THRESHOLD;

pub const DEFAULT_STRATEGY: &str = "pairs_trading";
pub const DEFAULT_LOOKBACK: usize = 60;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("lookback_period must be at least {min}, got {got}")]
    InvalidLookback { got: usize, min: usize },

    #[error("{name} out of range: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("channel_capacity must be at least 1")]
    InvalidCapacity,

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        value: value.to_string(),
    })
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

fn default_lookback() -> usize {
    DEFAULT_LOOKBACK
}

fn default_p_value_threshold() -> f64 {
    DEFAULT_P_VALUE_THRESHOLD
}

fn default_zscore_threshold() -> f64 {
    DEFAULT_ZSCORE_THRESHOLD
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Everything needed to reproduce one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// First simulated date (inclusive).
    pub start_date: NaiveDate,

    /// Last simulated date (inclusive).
    pub end_date: NaiveDate,

    /// Trailing bars per ticker fed to the cointegration test.
    #[serde(default = "default_lookback")]
    pub lookback_period: usize,

    /// Pairs are accepted when `p_value < p_value_threshold`.
    #[serde(default = "default_p_value_threshold")]
    pub p_value_threshold: f64,

    /// Spread z-score band for accepted pairs. Does not affect acceptance.
    #[serde(default = "default_zscore_threshold")]
    pub zscore_threshold: f64,

    #[serde(default)]
    pub parallel_screen: bool,

    /// Bound of the event channel between the simulation and its consumer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SimulationConfig {
    /// Config with default parameters for the given date range.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            strategy: default_strategy(),
            start_date,
            end_date,
            lookback_period: DEFAULT_LOOKBACK,
            p_value_threshold: DEFAULT_P_VALUE_THRESHOLD,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            parallel_screen: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Config from `YYYY-MM-DD` strings. Validated.
    pub fn from_date_strings(start: &str, end: &str) -> Result<Self, ConfigError> {
        let config = Self::new(parse_date(start)?, parse_date(end)?);
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date > self.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.lookback_period < MIN_OBSERVATIONS {
            return Err(ConfigError::InvalidLookback {
                got: self.lookback_period,
                min: MIN_OBSERVATIONS,
            });
        }
        if !(self.p_value_threshold > 0.0 && self.p_value_threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "p_value_threshold",
                value: self.p_value_threshold,
            });
        }
        if !(self.zscore_threshold > 0.0 && self.zscore_threshold.is_finite()) {
            return Err(ConfigError::InvalidThreshold {
                name: "zscore_threshold",
                value: self.zscore_threshold,
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }

    /// BLAKE3 over the canonical JSON of this config.
    pub fn params_hash(&self) -> String {
        // Plain fields only; serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    pub fn run_key(&self, started_at: NaiveDateTime) -> RunKey {
        RunKey {
            strategy: self.strategy.clone(),
            params_hash: self.params_hash(),
            started_at,
        }
    }
}

/// Identifies one run: which strategy, with which parameters, started when.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub strategy: String,
    pub params_hash: String,
    pub started_at: NaiveDateTime,
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.params_hash.get(..12).unwrap_or(&self.params_hash);
        write!(
            f,
            "{}@{}#{}",
            self.strategy,
            self.started_at.format("%Y%m%dT%H%M%S"),
            short
        )
    }
}
