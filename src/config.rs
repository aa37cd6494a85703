use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{LevelError, Result};
use crate::filter::FilterConfig;
use crate::monitor::SourceMode;

pub const ENV_ALPHA: &str = "TRUELEVEL_ALPHA";
pub const ENV_HZ: &str = "TRUELEVEL_HZ";
pub const ENV_DEMO: &str = "TRUELEVEL_DEMO";
pub const ENV_RUN_SECS: &str = "TRUELEVEL_RUN_SECS";

const DEFAULT_RUN_SECS: u64 = 5;

/// Sampling rates offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePreset {
    Hz30,
    Hz60,
    Hz100,
}

impl RatePreset {
    pub const ALL: [RatePreset; 3] = [RatePreset::Hz30, RatePreset::Hz60, RatePreset::Hz100];

    pub fn hz(self) -> u32 {
        match self {
            RatePreset::Hz30 => 30,
            RatePreset::Hz60 => 60,
            RatePreset::Hz100 => 100,
        }
    }

    pub fn interval_secs(self) -> f64 {
        1.0 / self.hz() as f64
    }
}

impl From<RatePreset> for u32 {
    fn from(preset: RatePreset) -> Self {
        preset.hz()
    }
}

impl TryFrom<u32> for RatePreset {
    type Error = LevelError;

    fn try_from(hz: u32) -> Result<Self> {
        match hz {
            30 => Ok(RatePreset::Hz30),
            60 => Ok(RatePreset::Hz60),
            100 => Ok(RatePreset::Hz100),
            _ => Err(LevelError::InvalidConfig(format!("unsupported rate {} Hz, expected 30, 60 or 100", hz))),
        }
    }
}

/// Settings for a level session.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelConfig {
    pub filter: FilterConfig,
    pub mode: SourceMode,
    pub run_time: Duration,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self { filter: FilterConfig::default(), mode: SourceMode::Sensor, run_time: Duration::from_secs(DEFAULT_RUN_SECS) }
    }
}

impl LevelConfig {
    /// Defaults overridden by `TRUELEVEL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        let alpha = match lookup(ENV_ALPHA) {
            Some(value) => parse::<f64>(ENV_ALPHA, &value)?,
            None => config.filter.alpha(),
        };

        let interval = match lookup(ENV_HZ) {
            Some(value) => RatePreset::try_from(parse::<u32>(ENV_HZ, &value)?)?.interval_secs(),
            None => config.filter.update_interval_secs(),
        };

        config.filter = FilterConfig::new(alpha, interval)?;

        if let Some(value) = lookup(ENV_DEMO) {
            if parse_flag(ENV_DEMO, &value)? {
                config.mode = SourceMode::Demo;
            }
        }

        if let Some(value) = lookup(ENV_RUN_SECS) {
            config.run_time = Duration::from_secs(parse::<u64>(ENV_RUN_SECS, &value)?);
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| LevelError::InvalidConfig(format!("{}: cannot parse {:?}", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(LevelError::InvalidConfig(format!("{}: expected a boolean, got {:?}", key, value))),
    }
}
