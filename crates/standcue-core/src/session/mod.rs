mod config;
mod machine;
mod sequencer;

pub use config::{SessionConfig, MAX_PAUSE_SECS};
pub use machine::{SessionMachine, SessionState};
pub use sequencer::{CueSequencer, CueStage, SequenceIo, SequenceProgress, SECOND_CUE_REPEATS};
