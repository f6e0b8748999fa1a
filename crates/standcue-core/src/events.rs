use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{CueStage, SessionState};
use crate::sound::CueId;

/// Every state change in a session produces an Event.
/// The runner drains them after each call into the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_secs: u64,
        first_interval_secs: u64,
        at: DateTime<Utc>,
    },
    /// The prompt countdown hit zero and a cue sequence is starting.
    PromptDue {
        /// 1-based prompt number within the session.
        prompt: u32,
        final_prompt: bool,
        at: DateTime<Utc>,
    },
    /// Session time ran out; the next acknowledgement ends the session.
    SessionTimeElapsed {
        at: DateTime<Utc>,
    },
    CueStarted {
        stage: CueStage,
        cue: CueId,
        at: DateTime<Utc>,
    },
    /// A cue could not be played and was skipped.
    CueSkipped {
        stage: CueStage,
        cue: Option<CueId>,
        reason: String,
        at: DateTime<Utc>,
    },
    AwaitingAcknowledgement {
        final_prompt: bool,
        attention_cue: Option<CueId>,
        at: DateTime<Utc>,
    },
    Acknowledged {
        /// Interval until the next prompt, or `None` when the session is over.
        next_interval_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    /// The final prompt was acknowledged.
    SessionFinished {
        prompts_acknowledged: u32,
        at: DateTime<Utc>,
    },
    SessionStopped {
        /// True when the session ran to its natural end.
        completed: bool,
        prompts_acknowledged: u32,
        started_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        session_secs_remaining: u64,
        next_prompt_secs_remaining: u64,
        is_last_interval: bool,
        sequence_playing: bool,
        cue_stage: CueStage,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Snake-case tag used in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "session_started",
            Event::PromptDue { .. } => "prompt_due",
            Event::SessionTimeElapsed { .. } => "session_time_elapsed",
            Event::CueStarted { .. } => "cue_started",
            Event::CueSkipped { .. } => "cue_skipped",
            Event::AwaitingAcknowledgement { .. } => "awaiting_acknowledgement",
            Event::Acknowledged { .. } => "acknowledged",
            Event::SessionFinished { .. } => "session_finished",
            Event::SessionStopped { .. } => "session_stopped",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_serialized_tag() {
        let event = Event::Acknowledged {
            next_interval_secs: Some(30),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["next_interval_secs"], 30);
    }

    #[test]
    fn cue_stage_serializes_with_repeat_count() {
        let event = Event::CueStarted {
            stage: CueStage::SecondCueRepeat(3),
            cue: CueId::new("tick"),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"]["stage"], "second_cue_repeat");
        assert_eq!(json["stage"]["repeat"], 3);
        assert_eq!(json["cue"], "tick");
    }
}
