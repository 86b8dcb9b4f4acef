//! Persisted state between runs
//!
//! A small JSON document holding the last resolved device attributes and
//! the time of the last proactive event batch.

use crate::domain::types::GeoAddress;
use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Device attributes resolved on a previous run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoAddress>,
}

impl DeviceState {
    /// Stored timezone, if it is still a known zone
    pub fn tz(&self) -> Option<Tz> {
        self.timezone.parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_proactive_event: Option<DateTime<Utc>>,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read state; a missing file is an empty state
    pub fn load(&self) -> anyhow::Result<StoredState> {
        if !self.path.exists() {
            return Ok(StoredState::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file {}", self.path.display()))
    }

    /// Write state, creating parent directories as needed
    pub fn save(&self, state: &StoredState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(state).context("Failed to encode state")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write state file {}", self.path.display()))?;
        debug!(file = %self.path.display(), "state_saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), StoredState::default());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        let state = StoredState {
            device: Some(DeviceState {
                timezone: "America/Chicago".to_string(),
                location: Some(GeoAddress {
                    city: Some("Austin".to_string()),
                    lat: 30.27,
                    lng: -97.74,
                    ..Default::default()
                }),
            }),
            last_proactive_event: Some(Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()),
        };

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
        assert_eq!(state.device.as_ref().and_then(DeviceState::tz), Some(Tz::America__Chicago));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(StateStore::new(&path).load().is_err());
    }

    #[test]
    fn test_unknown_stored_timezone_ignored() {
        let device = DeviceState { timezone: "Mars/Olympus".to_string(), location: None };
        assert!(device.tz().is_none());
    }
}
