//! TOML-based application preferences.
//!
//! Holds everything that is not part of a profile:
//! - Which profile `session run` uses by default
//! - Sound backend and cue length
//! - Log filter
//!
//! Stored at `<data_dir>/config.toml`. Profile settings live in the database.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use super::keypath;
use super::profiles::Profile;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundBackend {
    /// Terminal bell plus a printed cue name.
    #[default]
    Bell,
    /// Decoded audio files from `sounds_dir`.
    File,
    /// No output; cues still take `cue_length_ms` to "play".
    Silent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default)]
    pub backend: SoundBackend,
    /// Nominal length of a cue for backends that cannot measure it.
    #[serde(default = "default_cue_length_ms")]
    pub cue_length_ms: u64,
    /// Directory of `<cue>.{wav,ogg,mp3,flac}` files; defaults to `<data_dir>/sounds`.
    #[serde(default)]
    pub sounds_dir: Option<PathBuf>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub default_profile: Profile,
    #[serde(default)]
    pub sound: SoundConfig,
    /// `tracing` filter directive used when `STANDCUE_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_cue_length_ms() -> u64 {
    700
}
fn default_log_filter() -> String {
    "warn".into()
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            backend: SoundBackend::Bell,
            cue_length_ms: default_cue_length_ms(),
            sounds_dir: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_profile: Profile::default(),
            sound: SoundConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Default location, `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from disk, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a value as a string by dot-separated key, e.g. `sound.backend`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        keypath::lookup(&json, key).map(keypath::render)
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse as
    /// the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        keypath::assign(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        Ok(())
    }

    /// Directory holding cue audio files.
    pub fn sounds_dir(&self) -> PathBuf {
        self.sound
            .sounds_dir
            .clone()
            .or_else(|| data_dir().ok().map(|d| d.join("sounds")))
            .unwrap_or_else(|| PathBuf::from("sounds"))
    }
}
