//! Per-profile session settings.
//!
//! [`SettingsProvider`] is what the session runner reads a [`SessionConfig`]
//! from at session start. [`SettingsStore`] persists overrides in the database
//! kv table under `profile.<name>`; profiles without an override fall back to
//! their built-in defaults.

use std::collections::HashMap;

use tracing::warn;

use super::database::Database;
use super::keypath;
use super::profiles::{profile_spec, Profile};
use crate::error::{ConfigError, CoreError};
use crate::session::SessionConfig;
use crate::timer::IntervalSpec;

/// Keys accepted by [`SettingsProvider::set_field`].
pub const FIELD_KEYS: [&str; 7] = [
    "session_duration_min",
    "interval",
    "interval.min",
    "interval.max",
    "pause1_secs",
    "pause2_secs",
    "third_cue_enabled",
];

pub trait SettingsProvider {
    /// Current settings for `profile`; defaults when nothing usable is stored.
    fn get(&self, profile: Profile) -> SessionConfig;

    /// Replace the settings for `profile`.
    ///
    /// # Errors
    /// Refuses configurations that fail validation or the profile's bounds,
    /// and reports storage failures.
    fn set(&mut self, profile: Profile, config: SessionConfig) -> Result<(), ConfigError>;

    /// Drop any override and return the profile defaults.
    fn reset(&mut self, profile: Profile) -> Result<SessionConfig, ConfigError>;

    /// Read one field as text, e.g. `interval.min`.
    fn get_field(&self, profile: Profile, key: &str) -> Option<String> {
        let config = self.get(profile);
        if key == "interval.min" || key == "interval.max" {
            let (min, max) = config.interval.bounds();
            let n = if key == "interval.min" { min } else { max };
            return Some(n.to_string());
        }
        let json = serde_json::to_value(&config).ok()?;
        keypath::lookup(&json, key).map(keypath::render)
    }

    /// Update one field from text and persist the result.
    fn set_field(
        &mut self,
        profile: Profile,
        key: &str,
        value: &str,
    ) -> Result<SessionConfig, ConfigError> {
        let mut config = self.get(profile);
        apply_field(&mut config, key, value)?;
        self.set(profile, config.clone())?;
        Ok(config)
    }
}

/// Validation shared by every provider.
fn check(profile: Profile, config: &SessionConfig) -> Result<(), ConfigError> {
    config.validate()?;
    profile_spec(profile).bounds.check(config)
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a whole number")))
}

fn apply_field(config: &mut SessionConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "session_duration_min" => config.session_duration_min = parse_secs(key, value)?,
        "pause1_secs" => config.pause1_secs = parse_secs(key, value)?,
        "pause2_secs" => config.pause2_secs = parse_secs(key, value)?,
        "third_cue_enabled" => {
            config.third_cue_enabled = value
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not true/false")))?
        }
        "interval" => {
            config.interval = match value.trim().parse::<u64>() {
                Ok(secs) => IntervalSpec::Fixed(secs),
                Err(_) => serde_json::from_str(value)
                    .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
            }
        }
        "interval.min" | "interval.max" => {
            let n = parse_secs(key, value)?;
            let (min, max) = config.interval.bounds();
            let (min, max) = if key == "interval.min" { (n, max) } else { (min, n) };
            config.interval = if min == max {
                IntervalSpec::Fixed(min)
            } else {
                IntervalSpec::Range { min, max }
            };
        }
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }
    Ok(())
}

/// Settings persisted in the database kv table.
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the store in the default database.
    pub fn open() -> Result<Self, CoreError> {
        Ok(Self::new(Database::open()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn key(profile: Profile) -> String {
        format!("profile.{}", profile.name())
    }
}

impl SettingsProvider for SettingsStore {
    fn get(&self, profile: Profile) -> SessionConfig {
        let defaults = || profile_spec(profile).defaults;
        let raw = match self.db.kv_get(&Self::key(profile)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return defaults(),
            Err(e) => {
                warn!(%profile, error = %e, "could not read settings, using defaults");
                return defaults();
            }
        };
        match serde_json::from_str::<SessionConfig>(&raw) {
            Ok(cfg) if check(profile, &cfg).is_ok() => cfg,
            Ok(_) => {
                warn!(%profile, "stored settings out of bounds, using defaults");
                defaults()
            }
            Err(e) => {
                warn!(%profile, error = %e, "stored settings unreadable, using defaults");
                defaults()
            }
        }
    }

    fn set(&mut self, profile: Profile, config: SessionConfig) -> Result<(), ConfigError> {
        check(profile, &config)?;
        let json =
            serde_json::to_string(&config).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        self.db.kv_set(&Self::key(profile), &json)?;
        Ok(())
    }

    fn reset(&mut self, profile: Profile) -> Result<SessionConfig, ConfigError> {
        self.db.kv_delete(&Self::key(profile))?;
        Ok(profile_spec(profile).defaults)
    }
}

/// Settings held in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    profiles: HashMap<Profile, SessionConfig>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsProvider for MemorySettings {
    fn get(&self, profile: Profile) -> SessionConfig {
        self.profiles
            .get(&profile)
            .cloned()
            .unwrap_or_else(|| profile_spec(profile).defaults)
    }

    fn set(&mut self, profile: Profile, config: SessionConfig) -> Result<(), ConfigError> {
        check(profile, &config)?;
        self.profiles.insert(profile, config);
        Ok(())
    }

    fn reset(&mut self, profile: Profile) -> Result<SessionConfig, ConfigError> {
        self.profiles.remove(&profile);
        Ok(profile_spec(profile).defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        SettingsStore::new(Database::open_memory().unwrap())
    }

    #[test]
    fn unset_profile_returns_defaults() {
        let s = store();
        assert_eq!(s.get(Profile::Training), profile_spec(Profile::Training).defaults);
        assert_eq!(s.get(Profile::Pomodoro), profile_spec(Profile::Pomodoro).defaults);
    }

    #[test]
    fn profiles_are_independent() {
        let mut s = store();
        s.set_field(Profile::Training, "pause1_secs", "7").unwrap();
        assert_eq!(s.get(Profile::Training).pause1_secs, 7);
        assert_eq!(
            s.get(Profile::Pomodoro).pause1_secs,
            profile_spec(Profile::Pomodoro).defaults.pause1_secs
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = store();
        s.set_field(Profile::Training, "session_duration_min", "12").unwrap();
        let restored = s.reset(Profile::Training).unwrap();
        assert_eq!(restored, profile_spec(Profile::Training).defaults);
        assert_eq!(s.get(Profile::Training), restored);
    }

    #[test]
    fn out_of_bounds_value_is_refused() {
        let mut s = store();
        assert!(s.set_field(Profile::Training, "pause2_secs", "99").is_err());
        assert!(s.set_field(Profile::Pomodoro, "session_duration_min", "7").is_err());
        assert!(s.set_field(Profile::Training, "session_duration_min", "0").is_err());
        assert_eq!(s.get(Profile::Training), profile_spec(Profile::Training).defaults);
    }

    #[test]
    fn interval_accepts_fixed_and_range_forms() {
        let mut s = store();
        let cfg = s.set_field(Profile::Training, "interval", "45").unwrap();
        assert_eq!(cfg.interval, IntervalSpec::Fixed(45));

        let cfg = s
            .set_field(Profile::Training, "interval", r#"{"min":15,"max":40}"#)
            .unwrap();
        assert_eq!(cfg.interval, IntervalSpec::Range { min: 15, max: 40 });

        let cfg = s.set_field(Profile::Training, "interval.max", "60").unwrap();
        assert_eq!(cfg.interval, IntervalSpec::Range { min: 15, max: 60 });
        assert_eq!(s.get_field(Profile::Training, "interval.min").as_deref(), Some("15"));
    }

    #[test]
    fn inverted_range_is_refused() {
        let mut s = store();
        assert!(s.set_field(Profile::Training, "interval.min", "100").is_err());
    }

    #[test]
    fn unknown_key_is_refused() {
        let mut s = store();
        assert!(matches!(
            s.set_field(Profile::Training, "volume", "3"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn garbage_in_kv_falls_back_to_defaults() {
        let s = store();
        s.database().kv_set("profile.training", "not json").unwrap();
        assert_eq!(s.get(Profile::Training), profile_spec(Profile::Training).defaults);
    }

    #[test]
    fn get_field_renders_values() {
        let s = MemorySettings::new();
        assert_eq!(s.get_field(Profile::Training, "third_cue_enabled").as_deref(), Some("true"));
        assert_eq!(s.get_field(Profile::Pomodoro, "session_duration_min").as_deref(), Some("30"));
        assert!(s.get_field(Profile::Training, "volume").is_none());
    }
}
