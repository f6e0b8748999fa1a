mod config;
pub mod database;
mod keypath;
pub mod profiles;
mod settings;

pub use config::{AppConfig, SoundBackend, SoundConfig};
pub use database::{Database, NewSessionRecord, SessionRecord, Stats};
pub use settings::{MemorySettings, SettingsProvider, SettingsStore, FIELD_KEYS};

use std::path::PathBuf;

/// Returns the standcue data directory, creating it if needed.
///
/// `STANDCUE_DATA_DIR` wins outright. Otherwise `~/.config/standcue`, or
/// `~/.config/standcue-dev` when `STANDCUE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("STANDCUE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STANDCUE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("standcue-dev")
            } else {
                base_dir.join("standcue")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
