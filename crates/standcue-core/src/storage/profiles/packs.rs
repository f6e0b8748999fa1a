//! Built-in profile definitions.

use super::types::{FieldBounds, Profile, ProfileBounds, ProfileSpec};
use crate::session::SessionConfig;
use crate::sound::{CueId, CueSet};
use crate::timer::IntervalSpec;

/// Training: five-minute drill, prompts every 10-30 seconds.
fn training() -> ProfileSpec {
    let bounds = ProfileBounds {
        session_duration_min: FieldBounds::new(1, 60, 1, 5),
        interval_secs: FieldBounds::new(5, 300, 1, 20),
        pause1_secs: FieldBounds::new(0, 10, 1, 2),
        pause2_secs: FieldBounds::new(0, 5, 1, 1),
    };
    ProfileSpec {
        profile: Profile::Training,
        description: "Short drill with frequent randomized stand-up prompts".into(),
        defaults: SessionConfig {
            session_duration_min: bounds.session_duration_min.default,
            interval: IntervalSpec::Range { min: 10, max: 30 },
            pause1_secs: bounds.pause1_secs.default,
            pause2_secs: bounds.pause2_secs.default,
            third_cue_enabled: true,
        },
        bounds,
        cues: CueSet {
            first: vec![
                CueId::new("stand_up_1"),
                CueId::new("stand_up_2"),
                CueId::new("stand_up_3"),
            ],
            second: CueId::new("beep"),
            third: CueId::new("well_done"),
            attention: Some(CueId::new("attention")),
        },
    }
}

/// Pomodoro: thirty-minute block, break prompts every 5-10 minutes.
fn pomodoro() -> ProfileSpec {
    let bounds = ProfileBounds {
        session_duration_min: FieldBounds::new(5, 180, 5, 30),
        interval_secs: FieldBounds::new(60, 3600, 60, 420),
        pause1_secs: FieldBounds::new(0, 30, 1, 3),
        pause2_secs: FieldBounds::new(0, 10, 1, 2),
    };
    ProfileSpec {
        profile: Profile::Pomodoro,
        description: "Long focus block with break prompts minutes apart".into(),
        defaults: SessionConfig {
            session_duration_min: bounds.session_duration_min.default,
            interval: IntervalSpec::Range { min: 300, max: 600 },
            pause1_secs: bounds.pause1_secs.default,
            pause2_secs: bounds.pause2_secs.default,
            third_cue_enabled: true,
        },
        bounds,
        cues: CueSet {
            first: vec![CueId::new("bell")],
            second: CueId::new("beep"),
            third: CueId::new("gong"),
            attention: None,
        },
    }
}

/// Definition of a built-in profile.
pub fn profile_spec(profile: Profile) -> ProfileSpec {
    match profile {
        Profile::Training => training(),
        Profile::Pomodoro => pomodoro(),
    }
}

/// All built-in profiles in display order.
pub fn builtin_profiles() -> Vec<ProfileSpec> {
    Profile::ALL.into_iter().map(profile_spec).collect()
}
