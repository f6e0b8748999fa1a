use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timer::IntervalSpec;

/// Longest pause allowed between cues.
pub const MAX_PAUSE_SECS: u64 = 3600;

/// Settings snapshot a session runs with.
///
/// Taken once at session start and never re-read mid-session, so editing a
/// profile while a session is live only affects the next session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_duration_min: u64,
    pub interval: IntervalSpec,
    /// Pause after the opening cue and after the last second cue.
    #[serde(default)]
    pub pause1_secs: u64,
    /// Pause between second-cue repetitions.
    #[serde(default)]
    pub pause2_secs: u64,
    #[serde(default)]
    pub third_cue_enabled: bool,
}

impl SessionConfig {
    /// Reject configurations a session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_duration_min == 0 {
            return Err(ConfigError::invalid(
                "session_duration_min",
                "must be > 0 minutes",
            ));
        }
        for (key, secs) in [("pause1_secs", self.pause1_secs), ("pause2_secs", self.pause2_secs)] {
            if secs > MAX_PAUSE_SECS {
                return Err(ConfigError::invalid(
                    key,
                    format!("must be at most {MAX_PAUSE_SECS} seconds"),
                ));
            }
        }
        self.interval.validate()
    }

    pub fn session_secs(&self) -> u64 {
        self.session_duration_min.saturating_mul(60)
    }

    pub fn pause1(&self) -> Duration {
        Duration::from_secs(self.pause1_secs)
    }

    pub fn pause2(&self) -> Duration {
        Duration::from_secs(self.pause2_secs)
    }
}
