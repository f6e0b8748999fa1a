use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::SessionConfig;
use crate::sound::CueSet;

/// Named configuration preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Short drills with frequent stand-up prompts.
    #[default]
    Training,
    /// Long work blocks with break prompts minutes apart.
    Pomodoro,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Training, Profile::Pomodoro];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Training => "training",
            Profile::Pomodoro => "pomodoro",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownProfile(s.to_string()))
    }
}

/// Allowed values for one numeric setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBounds {
    pub min: u64,
    pub max: u64,
    pub step: u64,
    pub default: u64,
}

impl FieldBounds {
    pub const fn new(min: u64, max: u64, step: u64, default: u64) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    pub fn check(&self, key: &str, value: u64) -> Result<(), ConfigError> {
        if value < self.min || value > self.max {
            return Err(ConfigError::invalid(
                key,
                format!("{value} is outside {}..={}", self.min, self.max),
            ));
        }
        if self.step > 1 && (value - self.min) % self.step != 0 {
            return Err(ConfigError::invalid(
                key,
                format!("{value} is not a multiple of {} from {}", self.step, self.min),
            ));
        }
        Ok(())
    }
}

/// Per-field bounds of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBounds {
    pub session_duration_min: FieldBounds,
    /// Applies to a fixed interval and to both ends of a range.
    pub interval_secs: FieldBounds,
    pub pause1_secs: FieldBounds,
    pub pause2_secs: FieldBounds,
}

impl ProfileBounds {
    /// Check every numeric field of `config`.
    pub fn check(&self, config: &SessionConfig) -> Result<(), ConfigError> {
        self.session_duration_min
            .check("session_duration_min", config.session_duration_min)?;
        let (min, max) = config.interval.bounds();
        self.interval_secs.check("interval.min", min)?;
        self.interval_secs.check("interval.max", max)?;
        self.pause1_secs.check("pause1_secs", config.pause1_secs)?;
        self.pause2_secs.check("pause2_secs", config.pause2_secs)
    }
}

/// Everything a profile brings: defaults, bounds and sounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub profile: Profile,
    pub description: String,
    pub defaults: SessionConfig,
    pub bounds: ProfileBounds,
    pub cues: CueSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parses_case_insensitively() {
        assert_eq!("Training".parse::<Profile>().unwrap(), Profile::Training);
        assert_eq!("pomodoro".parse::<Profile>().unwrap(), Profile::Pomodoro);
        assert!(matches!(
            "marathon".parse::<Profile>(),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn bounds_enforce_range_and_step() {
        let b = FieldBounds::new(60, 3600, 60, 300);
        assert!(b.check("interval", 300).is_ok());
        assert!(b.check("interval", 3600).is_ok());
        assert!(b.check("interval", 30).is_err());
        assert!(b.check("interval", 4000).is_err());
        assert!(b.check("interval", 301).is_err());
    }
}
