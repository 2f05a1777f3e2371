//! Configuration loading and persistence.
//!
//! User preferences live in `config.json` under the state root. A missing
//! file means defaults; a malformed file is a soft failure that falls back
//! to defaults with a warning, so a bad edit never bricks startup.

pub mod paths;

pub use paths::{home_dir, write_json_atomic, StateDirs};

use crate::domain::ExecuteConfig;
use crate::model::SamplingParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// User preferences persisted in `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPrefs {
    pub auto_confirm: bool,
    pub color_mode: String,
    pub typing_effect: bool,
    /// Default interaction mode for bare input: "ask" or "cmd".
    pub default_mode: String,
    pub safe_mode: bool,
}

impl Default for UserPrefs {
    fn default() -> Self {
        UserPrefs {
            auto_confirm: false,
            color_mode: "auto".to_string(),
            typing_effect: true,
            default_mode: "ask".to_string(),
            safe_mode: true,
        }
    }
}

/// Runtime configuration: preferences plus embedded sampling and execution
/// settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_preferences: UserPrefs,
    pub model_config: SamplingParams,
    pub execute_config: ExecuteConfig,
}

impl Config {
    /// Load from the state directory, merging the file over defaults.
    pub fn load(dirs: &StateDirs) -> Result<Self> {
        let path = &dirs.config_file;
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Config::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config {}", path.display()));
            }
        };

        match serde_json::from_str(&data) {
            Ok(cfg) => Ok(cfg),
            Err(err) => {
                tracing::warn!("ignoring malformed config {}: {err}", path.display());
                Ok(Config::default())
            }
        }
    }

    /// Persist atomically to `config.json`.
    pub fn save(&self, dirs: &StateDirs) -> Result<()> {
        write_json_atomic(&dirs.config_file, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs(tmp: &TempDir) -> StateDirs {
        StateDirs::resolve(Some(tmp.path())).expect("dirs")
    }

    #[test]
    fn load_defaults_when_missing() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = Config::load(&dirs(&tmp)).expect("config");
        assert!(cfg.user_preferences.safe_mode);
        assert_eq!(cfg.user_preferences.default_mode, "ask");
        assert!(!cfg.execute_config.dry_run);
    }

    #[test]
    fn load_defaults_on_malformed_json() {
        let tmp = TempDir::new().expect("tmp");
        let d = dirs(&tmp);
        fs::create_dir_all(&d.root).expect("mkdir");
        fs::write(&d.config_file, "{not json").expect("write");

        let cfg = Config::load(&d).expect("config");
        assert!(cfg.user_preferences.safe_mode);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let tmp = TempDir::new().expect("tmp");
        let d = dirs(&tmp);

        let mut cfg = Config::default();
        cfg.user_preferences.auto_confirm = true;
        cfg.user_preferences.default_mode = "cmd".to_string();
        cfg.execute_config.dry_run = true;
        cfg.save(&d).expect("save");

        let loaded = Config::load(&d).expect("load");
        assert!(loaded.user_preferences.auto_confirm);
        assert_eq!(loaded.user_preferences.default_mode, "cmd");
        assert!(loaded.execute_config.dry_run);
    }

    #[test]
    fn partial_config_file_keeps_defaults_for_missing_fields() {
        let tmp = TempDir::new().expect("tmp");
        let d = dirs(&tmp);
        fs::create_dir_all(&d.root).expect("mkdir");
        fs::write(&d.config_file, r#"{"user_preferences": {"auto_confirm": true}}"#)
            .expect("write");

        let cfg = Config::load(&d).expect("config");
        assert!(cfg.user_preferences.auto_confirm);
        assert!(cfg.user_preferences.safe_mode, "unset fields fall back to defaults");
        assert_eq!(cfg.model_config.max_tokens, 150);
    }
}
