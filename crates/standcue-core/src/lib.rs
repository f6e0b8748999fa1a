//! # standcue Core Library
//!
//! Business logic for the standcue habit-training reminder. A session counts
//! down, plays a chained audio cue sequence whenever a prompt is due, and
//! waits for the user to acknowledge before carrying on. The `standcue`
//! binary is a thin driver over this crate.
//!
//! ## Architecture
//!
//! - **Session Machine**: A sans-IO state machine; the caller supplies the
//!   current instant, playback completions and user input
//! - **Timer**: Two per-second countdowns (session and next prompt)
//! - **Cue Sequencer**: Explicit stage enum for the cue chain
//! - **Storage**: SQLite session history and profile settings, TOML app config
//!
//! ## Key Components
//!
//! - [`SessionMachine`]: Top-level session controller
//! - [`SoundPlayer`]: Port the machine drives for audio
//! - [`SettingsProvider`]: Per-profile configuration source
//! - [`Database`]: Session history and key-value persistence

pub mod error;
pub mod events;
pub mod session;
pub mod sound;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, SoundError};
pub use events::Event;
pub use session::{CueStage, SessionConfig, SessionMachine, SessionState};
pub use sound::{CueId, CueSet, PlaybackTicket, SoundPlayer};
pub use storage::profiles::Profile;
pub use storage::{AppConfig, Database, MemorySettings, SettingsProvider, SettingsStore};
pub use timer::IntervalSpec;
