//! Console settings persisted in the OS config directory.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calc::{FitMode, RestPolicy};
use crate::model::DayClasses;
use crate::session::ProgressPolicy;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub rest: RestPolicy,
    pub progress: ProgressPolicy,
    pub fit_mode: FitMode,
    pub day_classes: DayClasses,
    /// Rows whose summed flight time exceeds this many hours are highlighted.
    pub long_duty_hours: f64,
    /// Dataset opened at start-up.
    pub dataset_path: Option<PathBuf>,
    /// Pixels per hour of a fresh timeline.
    pub initial_zoom: f32,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            rest: RestPolicy::default(),
            progress: ProgressPolicy::default(),
            fit_mode: FitMode::default(),
            day_classes: DayClasses::default(),
            long_duty_hours: 60.0,
            dataset_path: None,
            initial_zoom: 12.0,
        }
    }
}

impl ConsoleSettings {
    /// Directory holding `settings.json`.
    pub fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "CrewTimeline")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Settings at `path`, or defaults when missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Ignoring malformed settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = ConsoleSettings {
            fit_mode: FitMode::Dense,
            long_duty_hours: 45.0,
            dataset_path: Some(PathBuf::from("/data/january.json")),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(ConsoleSettings::load_from(&path), settings);
    }

    #[test]
    fn partial_and_broken_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(ConsoleSettings::load_from(&path), ConsoleSettings::default());

        std::fs::write(&path, r#"{"long_duty_hours": 50.0}"#).unwrap();
        let loaded = ConsoleSettings::load_from(&path);
        assert_eq!(loaded.long_duty_hours, 50.0);
        assert_eq!(loaded.rest.min_rest_hours, 10.0);

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(ConsoleSettings::load_from(&path), ConsoleSettings::default());
    }
}
