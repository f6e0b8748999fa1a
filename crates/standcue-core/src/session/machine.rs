//! Session state machine.
//!
//! Composes the countdown timer and the cue sequencer and owns the sound
//! player. Like the timer, it has no internal thread: the caller feeds it the
//! current instant, playback completions and user input, then drains the
//! resulting [`Event`]s.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> AwaitingAcknowledgement -> Running ...
//!                                            \-> Ended -> Idle   (final prompt)
//! any  -> stop() -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut machine = SessionMachine::new(player, cues);
//! machine.start(config, Instant::now())?;
//! loop {
//!     // wait until machine.next_deadline(), a playback completion or input
//!     machine.advance(Instant::now());
//!     for event in machine.drain_events() { /* render */ }
//! }
//! ```

use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::sequencer::{CueSequencer, CueStage, SequenceIo, SequenceProgress};
use crate::error::{ConfigError, SoundError};
use crate::events::Event;
use crate::sound::{CueSet, PlaybackTicket, SoundPlayer};
use crate::timer::{CountdownTimer, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    AwaitingAcknowledgement,
    /// Final prompt acknowledged; only observed on the way back to Idle.
    Ended,
}

pub struct SessionMachine<P, R = Pcg64> {
    io: SequenceIo<P, R>,
    state: SessionState,
    config: Option<SessionConfig>,
    timer: CountdownTimer,
    sequencer: CueSequencer,
    prompts_due: u32,
    prompts_acknowledged: u32,
    started_at: Option<DateTime<Utc>>,
}

impl<P: SoundPlayer> SessionMachine<P, Pcg64> {
    /// Create an idle machine with an entropy-seeded random source.
    pub fn new(player: P, cues: CueSet) -> Self {
        Self::with_rng(player, cues, Pcg64::from_entropy())
    }
}

impl<P: SoundPlayer, R: Rng> SessionMachine<P, R> {
    pub fn with_rng(player: P, cues: CueSet, rng: R) -> Self {
        Self {
            io: SequenceIo {
                player,
                cues,
                rng,
                events: Vec::new(),
            },
            state: SessionState::Idle,
            config: None,
            timer: CountdownTimer::new(),
            sequencer: CueSequencer::new(),
            prompts_due: 0,
            prompts_acknowledged: 0,
            started_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_secs_remaining(&self) -> u64 {
        self.timer.session_secs_remaining()
    }

    pub fn next_prompt_secs_remaining(&self) -> u64 {
        self.timer.next_prompt_secs_remaining()
    }

    /// Session time is used up; the prompt in flight (or next) is the last.
    pub fn is_last_interval(&self) -> bool {
        self.timer.session_ended()
    }

    pub fn sequence_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    pub fn cue_stage(&self) -> CueStage {
        self.sequencer.stage()
    }

    pub fn prompts_acknowledged(&self) -> u32 {
        self.prompts_acknowledged
    }

    pub fn player(&self) -> &P {
        &self.io.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.io.player
    }

    /// Earliest instant at which `advance` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timer.next_deadline(), self.sequencer.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            session_secs_remaining: self.session_secs_remaining(),
            next_prompt_secs_remaining: self.next_prompt_secs_remaining(),
            is_last_interval: self.is_last_interval(),
            sequence_playing: self.sequence_playing(),
            cue_stage: self.cue_stage(),
            at: Utc::now(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.io.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session with a pinned configuration.
    ///
    /// A running session is stopped first. On an invalid configuration nothing
    /// changes and the error is returned.
    pub fn start(&mut self, config: SessionConfig, now: Instant) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "refusing to start session");
            return Err(e);
        }
        self.stop();

        self.sequencer.reset(&mut self.io);
        self.sequencer.configure(&config);
        let first_interval = config.interval.pick(&mut self.io.rng);
        let session_secs = config.session_secs();
        self.timer.start(session_secs, first_interval, now);

        self.state = SessionState::Running;
        self.prompts_due = 0;
        self.prompts_acknowledged = 0;
        let started_at = Utc::now();
        self.started_at = Some(started_at);
        self.config = Some(config);

        info!(session_secs, first_interval, "session started");
        self.io.events.push(Event::SessionStarted {
            session_secs,
            first_interval_secs: first_interval,
            at: started_at,
        });
        Ok(())
    }

    /// Return to Idle from any state. Idempotent.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        let completed = self.state == SessionState::Ended;
        self.sequencer.reset(&mut self.io);
        self.timer.stop();
        self.state = SessionState::Idle;
        self.config = None;

        info!(completed, prompts = self.prompts_acknowledged, "session stopped");
        let now = Utc::now();
        self.io.events.push(Event::SessionStopped {
            completed,
            prompts_acknowledged: self.prompts_acknowledged,
            started_at: self.started_at.take().unwrap_or(now),
            at: now,
        });
    }

    /// The user confirmed the prompt.
    ///
    /// Returns false (and does nothing) unless a prompt is awaiting
    /// acknowledgement.
    pub fn acknowledge(&mut self, now: Instant) -> bool {
        if self.state != SessionState::AwaitingAcknowledgement {
            debug!(state = ?self.state, "acknowledge ignored");
            return false;
        }
        self.sequencer.stop_attention(&mut self.io);
        self.prompts_acknowledged += 1;

        if self.timer.session_ended() {
            self.state = SessionState::Ended;
            let at = Utc::now();
            self.io.events.push(Event::Acknowledged {
                next_interval_secs: None,
                at,
            });
            self.io.events.push(Event::SessionFinished {
                prompts_acknowledged: self.prompts_acknowledged,
                at,
            });
            self.stop();
            return true;
        }

        let next = match self.config {
            Some(ref cfg) => cfg.interval.pick(&mut self.io.rng),
            None => return false,
        };
        self.timer.resume(next, now);
        self.state = SessionState::Running;
        debug!(next, "prompt acknowledged, countdown resumed");
        self.io.events.push(Event::Acknowledged {
            next_interval_secs: Some(next),
            at: Utc::now(),
        });
        true
    }

    /// Start the cue sequence for a prompt.
    ///
    /// No-op when the session is inactive or a sequence is already running.
    pub fn play_sequence(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Running || self.sequencer.is_playing() {
            return false;
        }
        self.timer.suspend();
        self.prompts_due += 1;
        self.io.events.push(Event::PromptDue {
            prompt: self.prompts_due,
            final_prompt: self.timer.session_ended(),
            at: Utc::now(),
        });
        let progress = self.sequencer.play_sequence(now, &mut self.io);
        self.apply(progress);
        progress != SequenceProgress::Ignored
    }

    /// Process everything due at `now`: elapsed pauses first, then timer ticks.
    pub fn advance(&mut self, now: Instant) {
        if self.state == SessionState::Idle {
            return;
        }
        let progress = self.sequencer.advance(now, &mut self.io);
        self.apply(progress);

        if self.sequencer.is_playing() {
            return;
        }
        match self.timer.advance(now, false) {
            Some(TickOutcome::CountdownZero) => {
                self.play_sequence(now);
            }
            Some(TickOutcome::SessionEnded) => {
                info!("session time elapsed, final prompt");
                self.io
                    .events
                    .push(Event::SessionTimeElapsed { at: Utc::now() });
                self.play_sequence(now);
            }
            None => {}
        }
    }

    /// Report how a playback started by this machine ended.
    pub fn playback_finished(
        &mut self,
        ticket: PlaybackTicket,
        result: Result<(), SoundError>,
        now: Instant,
    ) {
        if self.state == SessionState::Idle {
            debug!(ticket = ticket.0, "completion after stop ignored");
            return;
        }
        let progress = self.sequencer.playback_finished(ticket, result, now, &mut self.io);
        self.apply(progress);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, progress: SequenceProgress) {
        if progress != SequenceProgress::AwaitingAcknowledgement
            || self.state == SessionState::AwaitingAcknowledgement
        {
            return;
        }
        self.state = SessionState::AwaitingAcknowledgement;
        let final_prompt = self.timer.session_ended();
        debug!(final_prompt, "cue sequence done, awaiting acknowledgement");
        self.io.events.push(Event::AwaitingAcknowledgement {
            final_prompt,
            attention_cue: self.io.cues.attention.clone(),
            at: Utc::now(),
        });
    }
}
