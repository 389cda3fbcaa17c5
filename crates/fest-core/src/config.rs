//! fest.toml configuration parser.
//!
//! The file is optional; every field has a default. Raw sections mirror the
//! TOML layout, and [`FestConfig::scheduler_config`] resolves them into the
//! validated values the scheduler works with.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8443;
pub const DEFAULT_DAY_START_HOUR: u32 = 9;
pub const DEFAULT_SLOT_MINUTES: u32 = 120;
pub const DEFAULT_DAILY_HOURS: f64 = 8.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FestConfig {
    pub server: Option<ServerConfig>,
    pub scheduler: Option<SchedulerSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerSection {
    pub day_start_hour: Option<u32>,
    pub day_start_minute: Option<u32>,
    pub slot_minutes: Option<u32>,
    pub default_daily_hours: Option<f64>,
    pub weights: Option<EventWeights>,
}

/// Weights of the whole-event priority score.
///
/// `score = departments × |target departments| + capacity × maximum students
/// + complexity × |sub-events|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventWeights {
    pub departments: f64,
    pub capacity: f64,
    pub complexity: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            departments: 0.4,
            capacity: 0.3,
            complexity: 0.3,
        }
    }
}

/// Resolved scheduler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Wall-clock time (UTC) at which each scheduling day opens.
    pub day_start: NaiveTime,
    /// Width of every generated slot.
    pub slot_width: TimeDelta,
    /// Daily working hours used when a run does not pass its own value.
    pub default_daily_hours: f64,
    pub weights: EventWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(DEFAULT_DAY_START_HOUR, 0, 0).unwrap_or_default(),
            slot_width: TimeDelta::minutes(i64::from(DEFAULT_SLOT_MINUTES)),
            default_daily_hours: DEFAULT_DAILY_HOURS,
            weights: EventWeights::default(),
        }
    }
}

impl SchedulerConfig {
    /// Slot width expressed in (possibly fractional) hours.
    pub fn slot_hours(&self) -> f64 {
        self.slot_width.num_minutes() as f64 / 60.0
    }
}

impl FestConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: FestConfig = toml::from_str(content)?;
        config.scheduler_config()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.server.as_ref().and_then(|s| s.data_dir.as_deref())
    }

    /// Resolve the `[scheduler]` section, applying defaults and validating ranges.
    pub fn scheduler_config(&self) -> anyhow::Result<SchedulerConfig> {
        let section = self.scheduler.clone().unwrap_or_default();
        let hour = section.day_start_hour.unwrap_or(DEFAULT_DAY_START_HOUR);
        let minute = section.day_start_minute.unwrap_or(0);
        let Some(day_start) = NaiveTime::from_hms_opt(hour, minute, 0) else {
            bail!("invalid day start {hour:02}:{minute:02}");
        };

        let slot_minutes = section.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
        if slot_minutes == 0 {
            bail!("slot_minutes must be positive");
        }

        let default_daily_hours = section.default_daily_hours.unwrap_or(DEFAULT_DAILY_HOURS);
        if !(default_daily_hours > 0.0 && default_daily_hours <= 24.0) {
            bail!("default_daily_hours must be in (0, 24], got {default_daily_hours}");
        }

        Ok(SchedulerConfig {
            day_start,
            slot_width: TimeDelta::minutes(i64::from(slot_minutes)),
            default_daily_hours,
            weights: section.weights.unwrap_or_default(),
        })
    }
}
