//! Engine settings and their persistence
//!
//! Saves and loads [`EngineSettings`] to/from a JSON file. Every field has a
//! default, so a partial file (or no file at all) still yields a usable
//! configuration.
//!
//! # File Location
//!
//! `lesson_settings.json` in the user's configuration directory, e.g.
//! `~/.config/XFChess/lesson_settings.json`. The `XFCHESS_LESSON_SETTINGS`
//! environment variable (also read from `.env`) points at another file.
//!
//! # Error Handling
//!
//! - [`load_settings`] never fails: read or parse errors are logged and the
//!   defaults are used
//! - [`save_settings`] reports failures to the caller

use crate::core::error::{CoreError, CoreResult};
use crate::core::logging::DEFAULT_LOG_FILTER;
use crate::lesson::scoring::ScoringThresholds;
use crate::rendering::animation::AnimationTimings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Settings filename
const SETTINGS_FILENAME: &str = "lesson_settings.json";

/// Environment variable overriding the settings path
pub const SETTINGS_PATH_ENV: &str = "XFCHESS_LESSON_SETTINGS";

/// Tunables for the lesson engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Longest wait for feedback animations before a step advances anyway
    pub feedback_grace_ms: u64,
    /// Pause before the scripted computer reply is played
    pub computer_think_ms: u64,
    /// Per-phase animation durations
    pub animation: AnimationTimings,
    /// Difficulty adaptation thresholds (lessons may override)
    pub scoring: ScoringThresholds,
    /// Remap table for authored computer moves that no notation accepts
    pub move_aliases: BTreeMap<String, String>,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            feedback_grace_ms: 1200,
            computer_think_ms: 400,
            animation: AnimationTimings::default(),
            scoring: ScoringThresholds::default(),
            move_aliases: default_move_aliases(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineSettings {
    pub fn feedback_grace(&self) -> Duration {
        Duration::from_millis(self.feedback_grace_ms)
    }

    pub fn computer_think(&self) -> Duration {
        Duration::from_millis(self.computer_think_ms)
    }
}

/// Castling written with zeros or lowercase letters shows up in authored lessons
fn default_move_aliases() -> BTreeMap<String, String> {
    [
        ("0-0", "O-O"),
        ("0-0-0", "O-O-O"),
        ("o-o", "O-O"),
        ("o-o-o", "O-O-O"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// Resolve the settings file path
///
/// Honours [`SETTINGS_PATH_ENV`], then the platform config directory, then
/// falls back to `lesson_settings.json` in the working directory.
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        return PathBuf::from(path);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "trilltino", "XFChess") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        PathBuf::from(SETTINGS_FILENAME)
    }
}

/// Load settings from the default location, falling back to defaults
pub fn load_settings() -> EngineSettings {
    load_settings_from(&settings_path())
}

/// Load settings from `path`, falling back to defaults on any error
pub fn load_settings_from(path: &Path) -> EngineSettings {
    if !path.exists() {
        info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
        return EngineSettings::default();
    }

    match read_settings(path) {
        Ok(settings) => {
            info!("[SETTINGS] Loaded settings from {:?}", path);
            settings
        }
        Err(e) => {
            warn!("[SETTINGS] {}. Using defaults.", e);
            EngineSettings::default()
        }
    }
}

/// Strictly read settings from `path`
pub fn read_settings(path: &Path) -> CoreResult<EngineSettings> {
    let contents = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save settings to the default location
pub fn save_settings(settings: &EngineSettings) -> CoreResult<PathBuf> {
    let path = settings_path();
    save_settings_to(&path, settings)?;
    Ok(path)
}

/// Save settings to `path`, creating the parent directory when needed
pub fn save_settings_to(path: &Path, settings: &EngineSettings) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(|e| CoreError::io(path, e))?;
    info!("[SETTINGS] Saved settings to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("xfchess-lessons-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.feedback_grace(), Duration::from_millis(1200));
        assert_eq!(settings.move_aliases.get("0-0").map(String::as_str), Some("O-O"));
        assert_eq!(settings.scoring, ScoringThresholds::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        //! Missing keys fall back to their defaults
        let settings: EngineSettings =
            serde_json::from_str(r#"{ "feedbackGraceMs": 50 }"#).unwrap();
        assert_eq!(settings.feedback_grace_ms, 50);
        assert_eq!(settings.computer_think_ms, 400);
        assert_eq!(settings.animation, AnimationTimings::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path(SETTINGS_FILENAME);
        let mut settings = EngineSettings::default();
        settings.computer_think_ms = 0;
        settings
            .move_aliases
            .insert("Kingside".to_string(), "O-O".to_string());

        save_settings_to(&path, &settings).unwrap();
        assert_eq!(read_settings(&path).unwrap(), settings);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_or_broken_file_uses_defaults() {
        let missing = temp_path("missing.json");
        assert_eq!(load_settings_from(&missing), EngineSettings::default());

        let broken = temp_path("broken.json");
        fs::create_dir_all(broken.parent().unwrap()).unwrap();
        fs::write(&broken, "{ not json").unwrap();
        assert!(read_settings(&broken).is_err());
        assert_eq!(load_settings_from(&broken), EngineSettings::default());

        let _ = fs::remove_dir_all(broken.parent().unwrap());
    }
}
