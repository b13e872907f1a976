//! Engine configuration.
//!
//! Values are passed explicitly into every service call; nothing here is read
//! lazily from the environment once the config has been built.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use locktrack_core::{DenominationConverter, DisplayMode, RoundingPolicy};
use locktrack_inventory::StockThresholds;
use locktrack_sales::{Granularity, ReportOptions};

pub const ENV_LOW_STOCK_THRESHOLD: &str = "LOCKTRACK_LOW_STOCK_THRESHOLD";
pub const ENV_DISPLAY_MODE: &str = "LOCKTRACK_DISPLAY_MODE";
pub const ENV_ROUNDING: &str = "LOCKTRACK_ROUNDING";
pub const ENV_GRANULARITY: &str = "LOCKTRACK_REPORT_GRANULARITY";
pub const ENV_UTC_OFFSET_MINUTES: &str = "LOCKTRACK_UTC_OFFSET_MINUTES";
pub const ENV_MAX_CONFLICT_RETRIES: &str = "LOCKTRACK_MAX_CONFLICT_RETRIES";

/// Largest offset chrono accepts, exclusive.
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("malformed settings row: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global low-stock threshold; per-item overrides come from settings.
    pub low_stock_threshold: u64,
    pub display_mode: DisplayMode,
    pub rounding: RoundingPolicy,
    pub granularity: Granularity,
    pub utc_offset_minutes: i32,
    /// Re-read-and-retry attempts after a conflicting commit.
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            display_mode: DisplayMode::default(),
            rounding: RoundingPolicy::default(),
            granularity: Granularity::default(),
            utc_offset_minutes: 0,
            max_conflict_retries: 3,
        }
    }
}

impl EngineConfig {
    /// Read `LOCKTRACK_*` variables over the defaults.
    ///
    /// Unset variables keep their default silently; unparsable ones keep it
    /// with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            match v.trim().parse() {
                Ok(n) => config.low_stock_threshold = n,
                Err(_) => warn_default(ENV_LOW_STOCK_THRESHOLD, &v),
            }
        }
        if let Some(v) = lookup(ENV_DISPLAY_MODE) {
            match v.parse() {
                Ok(mode) => config.display_mode = mode,
                Err(_) => warn_default(ENV_DISPLAY_MODE, &v),
            }
        }
        if let Some(v) = lookup(ENV_ROUNDING) {
            match v.parse() {
                Ok(policy) => config.rounding = policy,
                Err(_) => warn_default(ENV_ROUNDING, &v),
            }
        }
        if let Some(v) = lookup(ENV_GRANULARITY) {
            match parse_granularity(&v) {
                Some(g) => config.granularity = g,
                None => warn_default(ENV_GRANULARITY, &v),
            }
        }
        if let Some(v) = lookup(ENV_UTC_OFFSET_MINUTES) {
            match v.trim().parse::<i32>() {
                Ok(m) if m.abs() < MAX_OFFSET_MINUTES => config.utc_offset_minutes = m,
                _ => warn_default(ENV_UTC_OFFSET_MINUTES, &v),
            }
        }
        if let Some(v) = lookup(ENV_MAX_CONFLICT_RETRIES) {
            match v.trim().parse() {
                Ok(n) => config.max_conflict_retries = n,
                Err(_) => warn_default(ENV_MAX_CONFLICT_RETRIES, &v),
            }
        }

        config
    }

    /// Parse a JSON settings row. Missing fields take their defaults.
    pub fn from_json(row: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(row)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(ConfigError::Invalid {
                key: "utc_offset_minutes",
                value: self.utc_offset_minutes.to_string(),
                reason: "must be within one day of UTC".to_string(),
            });
        }
        Ok(())
    }

    pub fn converter(&self) -> DenominationConverter {
        DenominationConverter::new(self.rounding)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            granularity: self.granularity,
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }

    pub fn thresholds(&self) -> StockThresholds {
        StockThresholds::new(self.low_stock_threshold)
    }
}

fn parse_granularity(s: &str) -> Option<Granularity> {
    match s.trim().to_lowercase().as_str() {
        "day" | "daily" => Some(Granularity::Day),
        "month" | "monthly" => Some(Granularity::Month),
        _ => None,
    }
}

fn warn_default(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid configuration value; using default");
}
