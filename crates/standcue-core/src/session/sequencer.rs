//! Cue sequence orchestration.
//!
//! One prompt is a fixed chain of cues:
//!
//! ```text
//! FirstCue -pause1-> SecondCueRepeat(1) -pause2-> ... SecondCueRepeat(5)
//!          -pause1-> [ThirdCue] -> LoopingSignal
//! ```
//!
//! Each stage either waits for a playback ticket to come back or for its
//! trailing pause to elapse. [`CueSequencer::drive`] is the only place that
//! moves from one stage to the next, and it moves at most one stage per loop
//! iteration, so every transition can be exercised on its own.
//!
//! A cue that fails to start or reports failure is skipped: its trailing
//! pause still elapses and the chain carries on.

use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::{SessionConfig, MAX_PAUSE_SECS};
use crate::error::SoundError;
use crate::events::Event;
use crate::sound::{CueId, CueSet, PlaybackTicket, SoundPlayer};

/// Number of times the second cue plays per sequence.
pub const SECOND_CUE_REPEATS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "stage", content = "repeat", rename_all = "snake_case")]
pub enum CueStage {
    #[default]
    Idle,
    FirstCue,
    /// Carries the 1-based repetition currently playing.
    SecondCueRepeat(u8),
    ThirdCue,
    /// Sequence finished; the attention cue loops until acknowledgement.
    LoopingSignal,
}

/// Where a sequence stands after a call into the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceProgress {
    /// Call had no effect.
    Ignored,
    /// Still playing or pausing between cues.
    InProgress,
    /// Reached the looping signal; waiting for the user.
    AwaitingAcknowledgement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Nothing,
    Playback(PlaybackTicket),
    Until(Instant),
}

/// Everything the sequencer acts on but does not own.
pub struct SequenceIo<P, R> {
    pub player: P,
    pub cues: CueSet,
    pub rng: R,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone)]
pub struct CueSequencer {
    stage: CueStage,
    wait: Wait,
    pause1: Duration,
    pause2: Duration,
    third_cue_enabled: bool,
    last_ticket: u64,
}

impl Default for CueSequencer {
    fn default() -> Self {
        Self {
            stage: CueStage::Idle,
            wait: Wait::Nothing,
            pause1: Duration::ZERO,
            pause2: Duration::ZERO,
            third_cue_enabled: false,
            last_ticket: 0,
        }
    }
}

impl CueSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the pause lengths and third-cue flag for the coming session.
    pub fn configure(&mut self, config: &SessionConfig) {
        // Clamped so deadline arithmetic on `Instant` cannot overflow.
        let max = Duration::from_secs(MAX_PAUSE_SECS);
        self.pause1 = config.pause1().min(max);
        self.pause2 = config.pause2().min(max);
        self.third_cue_enabled = config.third_cue_enabled;
    }

    pub fn stage(&self) -> CueStage {
        self.stage
    }

    /// True from the opening cue until the attention loop is stopped.
    pub fn is_playing(&self) -> bool {
        self.stage != CueStage::Idle
    }

    pub fn is_awaiting_acknowledgement(&self) -> bool {
        self.stage == CueStage::LoopingSignal
    }

    /// Ticket of the playback currently awaited, if any.
    pub fn pending_ticket(&self) -> Option<PlaybackTicket> {
        match self.wait {
            Wait::Playback(t) => Some(t),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.wait {
            Wait::Until(at) => Some(at),
            _ => None,
        }
    }

    /// Begin a new sequence. Ignored while one is already running.
    pub fn play_sequence<P: SoundPlayer, R: Rng>(
        &mut self,
        now: Instant,
        io: &mut SequenceIo<P, R>,
    ) -> SequenceProgress {
        if self.is_playing() {
            debug!(stage = ?self.stage, "cue sequence already running, ignoring start");
            return SequenceProgress::Ignored;
        }
        let first = io.cues.pick_first(&mut io.rng).cloned();
        self.play_stage(CueStage::FirstCue, first, now, io);
        self.drive(now, io)
    }

    /// Report the end of a playback started by this sequencer.
    pub fn playback_finished<P: SoundPlayer, R: Rng>(
        &mut self,
        ticket: PlaybackTicket,
        result: Result<(), SoundError>,
        now: Instant,
        io: &mut SequenceIo<P, R>,
    ) -> SequenceProgress {
        if self.wait != Wait::Playback(ticket) {
            debug!(ticket = ticket.0, "ignoring completion for stale ticket");
            return SequenceProgress::Ignored;
        }
        if let Err(e) = result {
            let cue = self.cue_for(self.stage, &io.cues);
            warn!(stage = ?self.stage, error = %e, "cue playback failed, skipping");
            io.events.push(Event::CueSkipped {
                stage: self.stage,
                cue,
                reason: e.to_string(),
                at: Utc::now(),
            });
        }
        self.wait = Wait::Until(now + self.pause_after(self.stage));
        self.drive(now, io)
    }

    /// Let elapsed pauses move the sequence forward.
    pub fn advance<P: SoundPlayer, R: Rng>(
        &mut self,
        now: Instant,
        io: &mut SequenceIo<P, R>,
    ) -> SequenceProgress {
        if !self.is_playing() {
            return SequenceProgress::Ignored;
        }
        self.drive(now, io)
    }

    /// Silence the attention loop after the user acknowledged.
    pub fn stop_attention<P: SoundPlayer, R>(&mut self, io: &mut SequenceIo<P, R>) {
        if let Some(ref cue) = io.cues.attention {
            io.player.stop(cue);
        }
        self.stage = CueStage::Idle;
        self.wait = Wait::Nothing;
    }

    /// Stop all sounds and forget any in-flight stage.
    pub fn reset<P: SoundPlayer, R>(&mut self, io: &mut SequenceIo<P, R>) {
        io.player.stop_all();
        self.stage = CueStage::Idle;
        self.wait = Wait::Nothing;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn drive<P: SoundPlayer, R: Rng>(
        &mut self,
        now: Instant,
        io: &mut SequenceIo<P, R>,
    ) -> SequenceProgress {
        loop {
            match (self.stage, self.wait) {
                (CueStage::Idle, _) => return SequenceProgress::Ignored,
                (CueStage::LoopingSignal, _) => return SequenceProgress::AwaitingAcknowledgement,
                (_, Wait::Playback(_)) => return SequenceProgress::InProgress,
                (_, Wait::Until(at)) if at > now => return SequenceProgress::InProgress,
                _ => self.next_stage(now, io),
            }
        }
    }

    /// Leave the current stage once its trailing pause is over.
    fn next_stage<P: SoundPlayer, R: Rng>(&mut self, now: Instant, io: &mut SequenceIo<P, R>) {
        match self.stage {
            CueStage::FirstCue => {
                let cue = Some(io.cues.second.clone());
                self.play_stage(CueStage::SecondCueRepeat(1), cue, now, io);
            }
            CueStage::SecondCueRepeat(n) if n < SECOND_CUE_REPEATS => {
                let cue = Some(io.cues.second.clone());
                self.play_stage(CueStage::SecondCueRepeat(n + 1), cue, now, io);
            }
            CueStage::SecondCueRepeat(_) if self.third_cue_enabled => {
                let cue = Some(io.cues.third.clone());
                self.play_stage(CueStage::ThirdCue, cue, now, io);
            }
            CueStage::SecondCueRepeat(_) | CueStage::ThirdCue => self.enter_looping(io),
            CueStage::Idle | CueStage::LoopingSignal => {}
        }
    }

    fn play_stage<P: SoundPlayer, R>(
        &mut self,
        stage: CueStage,
        cue: Option<CueId>,
        now: Instant,
        io: &mut SequenceIo<P, R>,
    ) {
        debug!(?stage, "entering cue stage");
        self.stage = stage;

        let Some(cue) = cue else {
            warn!(?stage, "no cue configured for stage, skipping");
            io.events.push(Event::CueSkipped {
                stage,
                cue: None,
                reason: "no cue configured".into(),
                at: Utc::now(),
            });
            self.wait = Wait::Until(now + self.pause_after(stage));
            return;
        };

        self.last_ticket += 1;
        let ticket = PlaybackTicket(self.last_ticket);
        match io.player.play(ticket, &cue) {
            Ok(()) => {
                io.events.push(Event::CueStarted {
                    stage,
                    cue,
                    at: Utc::now(),
                });
                self.wait = Wait::Playback(ticket);
            }
            Err(e) => {
                warn!(?stage, %cue, error = %e, "cue could not start, skipping");
                io.events.push(Event::CueSkipped {
                    stage,
                    cue: Some(cue),
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                self.wait = Wait::Until(now + self.pause_after(stage));
            }
        }
    }

    fn enter_looping<P: SoundPlayer, R>(&mut self, io: &mut SequenceIo<P, R>) {
        self.stage = CueStage::LoopingSignal;
        self.wait = Wait::Nothing;
        let Some(cue) = io.cues.attention.clone() else {
            debug!("profile has no attention cue, waiting silently");
            return;
        };
        if let Err(e) = io.player.play_loop(&cue) {
            warn!(%cue, error = %e, "attention loop could not start");
            io.events.push(Event::CueSkipped {
                stage: CueStage::LoopingSignal,
                cue: Some(cue),
                reason: e.to_string(),
                at: Utc::now(),
            });
        }
    }

    fn pause_after(&self, stage: CueStage) -> Duration {
        match stage {
            CueStage::FirstCue => self.pause1,
            CueStage::SecondCueRepeat(n) if n < SECOND_CUE_REPEATS => self.pause2,
            CueStage::SecondCueRepeat(_) => self.pause1,
            _ => Duration::ZERO,
        }
    }

    fn cue_for(&self, stage: CueStage, cues: &CueSet) -> Option<CueId> {
        match stage {
            CueStage::SecondCueRepeat(_) => Some(cues.second.clone()),
            CueStage::ThirdCue => Some(cues.third.clone()),
            CueStage::LoopingSignal => cues.attention.clone(),
            // The opening cue is a random pick, not recoverable here.
            CueStage::FirstCue | CueStage::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::{PlayerCall, RecordingPlayer};
    use crate::timer::IntervalSpec;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn io() -> SequenceIo<RecordingPlayer, Pcg64> {
        SequenceIo {
            player: RecordingPlayer::new(),
            cues: CueSet {
                first: vec![CueId::new("stand")],
                second: CueId::new("tick"),
                third: CueId::new("chime"),
                attention: Some(CueId::new("alarm")),
            },
            rng: Pcg64::seed_from_u64(9),
            events: Vec::new(),
        }
    }

    fn sequencer(pause1: u64, pause2: u64, third: bool) -> CueSequencer {
        let mut seq = CueSequencer::new();
        seq.configure(&SessionConfig {
            session_duration_min: 1,
            interval: IntervalSpec::Fixed(1),
            pause1_secs: pause1,
            pause2_secs: pause2,
            third_cue_enabled: third,
        });
        seq
    }

    /// Complete pending playbacks successfully until nothing is pending.
    fn finish_all(
        seq: &mut CueSequencer,
        io: &mut SequenceIo<RecordingPlayer, Pcg64>,
        now: Instant,
    ) -> SequenceProgress {
        let mut progress = SequenceProgress::InProgress;
        while let Some(ticket) = io.player.take_pending() {
            progress = seq.playback_finished(ticket, Ok(()), now, io);
        }
        progress
    }

    #[test]
    fn zero_pause_sequence_runs_straight_to_loop() {
        let mut io = io();
        let mut seq = sequencer(0, 0, false);
        let now = Instant::now();
        assert_eq!(seq.play_sequence(now, &mut io), SequenceProgress::InProgress);
        assert_eq!(seq.stage(), CueStage::FirstCue);

        assert_eq!(finish_all(&mut seq, &mut io, now), SequenceProgress::AwaitingAcknowledgement);
        assert_eq!(io.player.plays_of("stand"), 1);
        assert_eq!(io.player.plays_of("tick"), 5);
        assert_eq!(io.player.plays_of("chime"), 0);
        assert!(io.player.is_looping("alarm"));
        assert!(seq.is_awaiting_acknowledgement());
    }

    #[test]
    fn second_play_request_is_ignored() {
        let mut io = io();
        let mut seq = sequencer(0, 0, false);
        let now = Instant::now();
        seq.play_sequence(now, &mut io);
        assert_eq!(seq.play_sequence(now, &mut io), SequenceProgress::Ignored);
        assert_eq!(io.player.plays_of("stand"), 1);
    }

    #[test]
    fn pauses_hold_the_next_stage() {
        let mut io = io();
        let mut seq = sequencer(3, 2, true);
        let t0 = Instant::now();
        seq.play_sequence(t0, &mut io);
        let ticket = io.player.take_pending().unwrap();
        seq.playback_finished(ticket, Ok(()), t0, &mut io);

        assert_eq!(seq.next_deadline(), Some(t0 + Duration::from_secs(3)));
        seq.advance(t0 + Duration::from_secs(2), &mut io);
        assert_eq!(seq.stage(), CueStage::FirstCue);
        seq.advance(t0 + Duration::from_secs(3), &mut io);
        assert_eq!(seq.stage(), CueStage::SecondCueRepeat(1));

        // First repetition ends; pause2 applies before the second.
        let ticket = io.player.take_pending().unwrap();
        let t1 = t0 + Duration::from_secs(4);
        seq.playback_finished(ticket, Ok(()), t1, &mut io);
        assert_eq!(seq.next_deadline(), Some(t1 + Duration::from_secs(2)));
    }

    #[test]
    fn failures_never_shorten_the_second_cue_stage() {
        let mut io = io();
        io.player.fail_cue("tick");
        let mut seq = sequencer(0, 0, true);
        let now = Instant::now();
        seq.play_sequence(now, &mut io);
        // Only the opening cue starts; every repetition of "tick" is refused.
        let ticket = io.player.take_pending().unwrap();
        let progress = seq.playback_finished(ticket, Ok(()), now, &mut io);
        assert_eq!(progress, SequenceProgress::InProgress);
        assert_eq!(io.player.plays_of("tick"), 5);
        assert_eq!(seq.stage(), CueStage::ThirdCue);
        let skipped = io
            .events
            .iter()
            .filter(|e| matches!(e, Event::CueSkipped { .. }))
            .count();
        assert_eq!(skipped, 5);
    }

    #[test]
    fn third_cue_plays_before_loop_when_enabled() {
        let mut io = io();
        let mut seq = sequencer(0, 0, true);
        let now = Instant::now();
        seq.play_sequence(now, &mut io);
        assert_eq!(finish_all(&mut seq, &mut io, now), SequenceProgress::AwaitingAcknowledgement);
        let calls = io.player.calls();
        let chime = calls
            .iter()
            .position(|c| *c == PlayerCall::Play(CueId::new("chime")))
            .unwrap();
        let alarm = calls
            .iter()
            .position(|c| *c == PlayerCall::Loop(CueId::new("alarm")))
            .unwrap();
        assert!(chime < alarm);
    }

    #[test]
    fn failed_completion_still_waits_for_pause() {
        let mut io = io();
        let mut seq = sequencer(4, 0, false);
        let t0 = Instant::now();
        seq.play_sequence(t0, &mut io);
        let ticket = io.player.take_pending().unwrap();
        seq.playback_finished(
            ticket,
            Err(SoundError::PlaybackFailed("decoder".into())),
            t0,
            &mut io,
        );
        assert_eq!(seq.stage(), CueStage::FirstCue);
        seq.advance(t0 + Duration::from_secs(4), &mut io);
        assert_eq!(seq.stage(), CueStage::SecondCueRepeat(1));
    }

    #[test]
    fn oversized_pause_is_clamped_instead_of_overflowing() {
        let mut io = io();
        let mut seq = sequencer(u64::MAX, u64::MAX, false);
        let t0 = Instant::now();
        seq.play_sequence(t0, &mut io);
        let ticket = io.player.take_pending().unwrap();
        assert_eq!(
            seq.playback_finished(ticket, Ok(()), t0, &mut io),
            SequenceProgress::InProgress
        );
        assert_eq!(
            seq.next_deadline(),
            Some(t0 + Duration::from_secs(MAX_PAUSE_SECS))
        );
        assert_eq!(seq.stage(), CueStage::FirstCue);
    }

    #[test]
    fn stale_ticket_after_reset_is_dropped() {
        let mut io = io();
        let mut seq = sequencer(0, 0, false);
        let now = Instant::now();
        seq.play_sequence(now, &mut io);
        let ticket = seq.pending_ticket().unwrap();
        seq.reset(&mut io);
        assert_eq!(
            seq.playback_finished(ticket, Ok(()), now, &mut io),
            SequenceProgress::Ignored
        );
        assert_eq!(seq.stage(), CueStage::Idle);
        assert_eq!(io.player.plays_of("tick"), 0);
    }

    #[test]
    fn missing_attention_cue_still_awaits() {
        let mut io = io();
        io.cues.attention = None;
        let mut seq = sequencer(0, 0, false);
        let now = Instant::now();
        seq.play_sequence(now, &mut io);
        assert_eq!(finish_all(&mut seq, &mut io, now), SequenceProgress::AwaitingAcknowledgement);
        assert!(!io
            .player
            .calls()
            .iter()
            .any(|c| matches!(c, PlayerCall::Loop(_))));
    }
}
