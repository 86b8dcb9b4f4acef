//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! API keys left empty in the file are taken from `AFTERSHIP_API_KEY` and
//! `GOOGLE_MAPS_API_KEY`.

use crate::error::BriefingError;
use crate::services::aggregator::{DateTolerance, GroupingPolicy};
use anyhow::Context;
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const AFTERSHIP_KEY_ENV: &str = "AFTERSHIP_API_KEY";
pub const GOOGLE_MAPS_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

const FALLBACK_TIMEZONE: Tz = Tz::US__Eastern;

/// Tracking source retention; older trackings cannot be returned
pub const MAX_DAYS_SEARCH: u32 = 90;

#[derive(Debug, Clone, Deserialize)]
pub struct AftershipConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_aftership_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_days_search")]
    pub days_search: u32,
    #[serde(default = "default_days_past_delivered")]
    pub days_past_delivered: u32,
    /// Regex a record's note must match to be narrated
    #[serde(default)]
    pub note_tagging: Option<String>,
    #[serde(default = "default_tracking_count_limit")]
    pub tracking_count_limit: usize,
}

impl Default for AftershipConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_aftership_endpoint(),
            days_search: default_days_search(),
            days_past_delivered: default_days_past_delivered(),
            note_tagging: None,
            tracking_count_limit: default_tracking_count_limit(),
        }
    }
}

fn default_aftership_endpoint() -> String {
    "https://api.aftership.com/v4".to_string()
}

fn default_days_search() -> u32 {
    30
}

fn default_days_past_delivered() -> u32 {
    1
}

fn default_tracking_count_limit() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleMapsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_google_maps_endpoint")]
    pub endpoint: String,
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self { api_key: String::new(), endpoint: default_google_maps_endpoint() }
    }
}

fn default_google_maps_endpoint() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_timezone_name")]
    pub default_timezone: String,
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone_name(),
            default_country: default_country(),
            country_code: None,
            postal_code: None,
            state_file: default_state_file(),
        }
    }
}

fn default_timezone_name() -> String {
    "US/Eastern".to_string()
}

fn default_country() -> String {
    "United States".to_string()
}

fn default_state_file() -> String {
    "state.json".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpeechConfig {
    #[serde(default)]
    pub mute_footnotes: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupingConfig {
    #[serde(default)]
    pub date_tolerance: DateTolerance,
    #[serde(default = "default_separate_pickup")]
    pub separate_pickup: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self { date_tolerance: DateTolerance::default(), separate_pickup: default_separate_pickup() }
    }
}

fn default_separate_pickup() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_schedule_rate_minutes")]
    pub schedule_rate_minutes: u32,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { schedule_rate_minutes: default_schedule_rate_minutes() }
    }
}

fn default_schedule_rate_minutes() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub aftership: AftershipConfig,
    #[serde(default)]
    pub google_maps: GoogleMapsConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    aftership_api_key: String,
    aftership_endpoint: String,
    days_search: u32,
    days_past_delivered: u32,
    note_filter: Option<Regex>,
    tracking_count_limit: usize,
    google_maps_api_key: String,
    google_maps_endpoint: String,
    default_timezone: Tz,
    default_country: String,
    country_code: Option<String>,
    postal_code: Option<String>,
    state_file: String,
    mute_footnotes: bool,
    grouping: GroupingPolicy,
    schedule_rate_minutes: u32,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aftership_api_key: String::new(),
            aftership_endpoint: default_aftership_endpoint(),
            days_search: default_days_search(),
            days_past_delivered: default_days_past_delivered(),
            note_filter: None,
            tracking_count_limit: default_tracking_count_limit(),
            google_maps_api_key: String::new(),
            google_maps_endpoint: default_google_maps_endpoint(),
            default_timezone: FALLBACK_TIMEZONE,
            default_country: default_country(),
            country_code: None,
            postal_code: None,
            state_file: default_state_file(),
            mute_footnotes: false,
            grouping: GroupingPolicy::default(),
            schedule_rate_minutes: default_schedule_rate_minutes(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Config file path: the `--config` value, else `CONFIG_FILE`, else the default
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let mut config = Self::from_toml(toml_config)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.config_file = path.display().to_string();
        Ok(config)
    }

    /// Flatten parsed sections, validating the note filter and timezone
    pub fn from_toml(toml_config: TomlConfig) -> Result<Self, BriefingError> {
        let note_filter = toml_config
            .aftership
            .note_tagging
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    BriefingError::Configuration(format!("invalid note_tagging pattern: {e}"))
                })
            })
            .transpose()?;

        let default_timezone = match toml_config.device.default_timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                eprintln!(
                    "Warning: unknown timezone {:?}. Using {}.",
                    toml_config.device.default_timezone, FALLBACK_TIMEZONE
                );
                FALLBACK_TIMEZONE
            }
        };

        let days_search = toml_config.aftership.days_search;
        if days_search > MAX_DAYS_SEARCH {
            eprintln!(
                "Warning: days_search {} exceeds {}. Using {}.",
                days_search, MAX_DAYS_SEARCH, MAX_DAYS_SEARCH
            );
        }

        Ok(Self {
            aftership_api_key: toml_config.aftership.api_key,
            aftership_endpoint: toml_config.aftership.endpoint,
            days_search: days_search.min(MAX_DAYS_SEARCH),
            days_past_delivered: toml_config.aftership.days_past_delivered,
            note_filter,
            tracking_count_limit: toml_config.aftership.tracking_count_limit,
            google_maps_api_key: toml_config.google_maps.api_key,
            google_maps_endpoint: toml_config.google_maps.endpoint,
            default_timezone,
            default_country: toml_config.device.default_country,
            country_code: toml_config.device.country_code,
            postal_code: toml_config.device.postal_code,
            state_file: toml_config.device.state_file,
            mute_footnotes: toml_config.speech.mute_footnotes,
            grouping: GroupingPolicy {
                date_tolerance: toml_config.grouping.date_tolerance,
                separate_pickup: toml_config.grouping.separate_pickup,
            },
            schedule_rate_minutes: toml_config.notifications.schedule_rate_minutes,
            config_file: "default".to_string(),
        })
    }

    /// Load from a path; only a missing file falls back to defaults
    ///
    /// Unreadable, unparseable or invalid files are errors so a bad setting
    /// never silently discards the rest of the file.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        let config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            eprintln!("Warning: config file {} not found. Using defaults.", path);
            Self::default()
        };
        Ok(config.with_key_overrides(env::var(AFTERSHIP_KEY_ENV).ok(), env::var(GOOGLE_MAPS_KEY_ENV).ok()))
    }

    /// Fill empty API keys from the given values
    pub fn with_key_overrides(mut self, aftership: Option<String>, google_maps: Option<String>) -> Self {
        if self.aftership_api_key.is_empty() {
            if let Some(key) = aftership.filter(|k| !k.is_empty()) {
                self.aftership_api_key = key;
            }
        }
        if self.google_maps_api_key.is_empty() {
            if let Some(key) = google_maps.filter(|k| !k.is_empty()) {
                self.google_maps_api_key = key;
            }
        }
        self
    }

    /// Check settings required before the pipeline runs
    pub fn validate(&self) -> Result<(), BriefingError> {
        if self.aftership_api_key.is_empty() {
            return Err(BriefingError::Configuration("aftership.api_key is not set".to_string()));
        }
        Ok(())
    }

    pub fn aftership_api_key(&self) -> &str {
        &self.aftership_api_key
    }

    pub fn aftership_endpoint(&self) -> &str {
        &self.aftership_endpoint
    }

    pub fn days_search(&self) -> u32 {
        self.days_search
    }

    pub fn days_past_delivered(&self) -> u32 {
        self.days_past_delivered
    }

    pub fn note_filter(&self) -> Option<&Regex> {
        self.note_filter.as_ref()
    }

    pub fn tracking_count_limit(&self) -> usize {
        self.tracking_count_limit
    }

    pub fn google_maps_api_key(&self) -> &str {
        &self.google_maps_api_key
    }

    pub fn google_maps_endpoint(&self) -> &str {
        &self.google_maps_endpoint
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    pub fn default_country(&self) -> &str {
        &self.default_country
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    /// "{country_code},{postal_code}" query for device geocoding, if both are set
    pub fn device_address_query(&self) -> Option<String> {
        match (self.country_code(), self.postal_code()) {
            (Some(country), Some(postal)) => Some(format!("{},{}", country, postal)),
            _ => None,
        }
    }

    pub fn state_file(&self) -> &str {
        &self.state_file
    }

    pub fn mute_footnotes(&self) -> bool {
        self.mute_footnotes
    }

    pub fn grouping(&self) -> GroupingPolicy {
        self.grouping
    }

    pub fn schedule_rate_minutes(&self) -> u32 {
        self.schedule_rate_minutes
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

}
