use crate::accessory::ObservedPolicy;
use crate::clock::ClockKind;
use crate::error::{HeatingError, Result};
use crate::http::StatusPath;
use crate::mode::Mode;
use crate::schedule::{DaySchedule, Interval, TimeOfDay, WeekSchedule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Heat threshold used when none is configured.
pub const DEFAULT_HEAT_TEMPERATURE: f64 = 19.0;
/// Off threshold used by schedule-only accessories.
pub const DEFAULT_OFF_TEMPERATURE: f64 = 15.0;
/// Off threshold used by accessories backed by an HTTP device.
pub const DEFAULT_HTTP_OFF_TEMPERATURE: f64 = 15.5;
/// Refresh/poll period used when none is configured.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Load environment variables from a `.env` file in the working directory.
///
/// Values may be unquoted and contain spaces. Variables that are already set
/// take precedence. Returns the number of variables that were set.
pub fn load_dotenv() -> usize {
    load_dotenv_from(Path::new(".env"))
}

fn load_dotenv_from(env_path: &Path) -> usize {
    let Ok(content) = fs::read_to_string(env_path) else {
        return 0;
    };

    let mut loaded = 0;
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the async runtime spawns threads
            unsafe { std::env::set_var(key, value) };
            loaded += 1;
        }
    }
    loaded
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                &value[1..value.len() - 1]
            } else {
                value
            };
            Some((key.trim(), value))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// One thermostat exposed to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable identifier, unique within the config.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub config: HeatingAccessoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatingAccessoryConfig {
    /// Mode at startup.
    #[serde(default)]
    pub mode: Mode,

    /// Heating intervals per weekday (0 = Sunday).
    #[serde(default)]
    pub schedule: Option<WeekSchedule>,

    /// Daily plan applied to every weekday when `schedule` is absent.
    #[serde(default)]
    pub planning: Option<Vec<PlanningItem>>,

    #[serde(default)]
    pub temperatures: Option<TemperatureConfig>,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default)]
    pub clock: ClockKind,

    /// Backing HTTP device. Absent for schedule-only accessories.
    #[serde(default)]
    pub http: Option<DeviceEndpoints>,
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Default for HeatingAccessoryConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            schedule: None,
            planning: None,
            temperatures: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            clock: ClockKind::default(),
            http: None,
        }
    }
}

/// Entry of the daily `planning` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningItem {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    /// 1 = heat, 0 = no heating
    #[serde(default = "default_planning_state")]
    pub state: u8,
}

fn default_planning_state() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureConfig {
    #[serde(default)]
    pub off: Option<f64>,
    #[serde(default)]
    pub heat: Option<f64>,
}

/// Displayed temperature for each heating state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub off: f64,
    pub heat: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            off: DEFAULT_OFF_TEMPERATURE,
            heat: DEFAULT_HEAT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEndpoints {
    pub heat_url: String,
    pub off_url: String,
    pub status_url: String,
    /// Path query evaluated against the JSON status payload.
    pub status_path: String,
    /// Literal that means "heating is active".
    pub status_value: serde_json::Value,
    #[serde(default)]
    pub policy: ObservedPolicy,
    /// Upper bound for every HTTP call. No bound when absent.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl DeviceEndpoints {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl HeatingAccessoryConfig {
    /// The effective week schedule.
    ///
    /// Heating entries of the daily `planning` list are used for every weekday
    /// when no `schedule` is configured. No schedule at all means no planned
    /// heating.
    pub fn week_schedule(&self) -> WeekSchedule {
        if let Some(schedule) = &self.schedule {
            return schedule.clone();
        }
        match &self.planning {
            Some(planning) => {
                let day: DaySchedule = planning
                    .iter()
                    .filter(|item| item.state != 0)
                    .map(|item| Interval::new(item.start_time, item.end_time))
                    .collect();
                WeekSchedule::every_day(day)
            }
            None => WeekSchedule::new(),
        }
    }

    /// Thresholds with per-field defaults for whichever values are missing.
    pub fn thresholds(&self) -> Thresholds {
        let default_off = if self.http.is_some() {
            DEFAULT_HTTP_OFF_TEMPERATURE
        } else {
            DEFAULT_OFF_TEMPERATURE
        };
        let configured = self.temperatures.unwrap_or_default();
        Thresholds {
            off: configured.off.unwrap_or(default_off),
            heat: configured.heat.unwrap_or(DEFAULT_HEAT_TEMPERATURE),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Check the parts of the config that cannot be defaulted.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.is_some() && self.planning.is_some() {
            log::warn!("Both `schedule` and `planning` configured; `planning` is ignored");
        }
        if let Some(http) = &self.http {
            for (field, url) in [
                ("heat_url", &http.heat_url),
                ("off_url", &http.off_url),
                ("status_url", &http.status_url),
            ] {
                if url.trim().is_empty() {
                    return Err(HeatingError::InvalidConfig(format!("`http.{}` is empty", field)));
                }
            }
            StatusPath::parse(&http.status_path)?;
        }
        Ok(())
    }
}

impl Config {
    /// Default config location: `<config dir>/heating-bridge/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("heating-bridge")
            .join("config.json")
    }

    /// Read and parse a config file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| HeatingError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_json(&content)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(secs) = std::env::var("HEATING_REFRESH_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            for device in &mut self.devices {
                device.config.refresh_interval_secs = secs;
            }
        }
    }
}
