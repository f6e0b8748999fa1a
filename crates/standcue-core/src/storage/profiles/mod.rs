//! Named configuration profiles.
//!
//! Two built-in profiles encapsulate the supported practice styles:
//!
//! - **Training**: short drills, prompts seconds apart
//! - **Pomodoro**: long focus blocks, prompts minutes apart
//!
//! Each profile carries its own defaults, per-field bounds and cue set.
//! Stored overrides are handled by [`SettingsProvider`](crate::storage::SettingsProvider).

mod packs;
mod types;

pub use packs::{builtin_profiles, profile_spec};
pub use types::{FieldBounds, Profile, ProfileBounds, ProfileSpec};
