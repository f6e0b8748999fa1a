//! Sound player port.
//!
//! The session machine never touches an audio device directly. It owns a
//! [`SoundPlayer`] handed in at construction and talks to it through tickets:
//! `play` starts a one-shot cue, and the caller later reports how that cue
//! ended by passing the same ticket to
//! [`SessionMachine::playback_finished`](crate::SessionMachine::playback_finished).

use std::collections::{HashSet, VecDeque};
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SoundError;

/// Name of a sound resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueId(String);

impl CueId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifies one `play` request so its completion can be matched later.
///
/// Tickets are never reused within a machine, so a completion that arrives
/// after a reset is recognised as stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybackTicket(pub u64);

/// The sounds a profile uses for one prompt sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSet {
    /// Interchangeable opening cues; one is drawn at random per sequence.
    pub first: Vec<CueId>,
    /// Repeated five times after the opening cue.
    pub second: CueId,
    /// Played last when the third cue is enabled.
    pub third: CueId,
    /// Looped while waiting for acknowledgement.
    #[serde(default)]
    pub attention: Option<CueId>,
}

impl CueSet {
    /// Draw an opening cue uniformly from the pool.
    pub fn pick_first<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&CueId> {
        match self.first.len() {
            0 => None,
            1 => self.first.first(),
            _ => self.first.choose(rng),
        }
    }
}

/// Audio output capability consumed by the session machine.
pub trait SoundPlayer {
    /// Start playing `cue` once.
    ///
    /// `Ok` means playback began and its outcome will be reported later with
    /// `ticket`. `Err` means the cue could not start at all.
    fn play(&mut self, ticket: PlaybackTicket, cue: &CueId) -> Result<(), SoundError>;

    /// Stop a single cue, including a looping one.
    fn stop(&mut self, cue: &CueId);

    /// Start repeating `cue` until it is stopped.
    fn play_loop(&mut self, cue: &CueId) -> Result<(), SoundError>;

    /// Stop everything and drop pending completions.
    fn stop_all(&mut self);
}

impl<P: SoundPlayer + ?Sized> SoundPlayer for Box<P> {
    fn play(&mut self, ticket: PlaybackTicket, cue: &CueId) -> Result<(), SoundError> {
        (**self).play(ticket, cue)
    }

    fn stop(&mut self, cue: &CueId) {
        (**self).stop(cue)
    }

    fn play_loop(&mut self, cue: &CueId) -> Result<(), SoundError> {
        (**self).play_loop(cue)
    }

    fn stop_all(&mut self) {
        (**self).stop_all()
    }
}

/// A call observed by [`RecordingPlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Play(CueId),
    Stop(CueId),
    Loop(CueId),
    StopAll,
}

/// Silent player that records every request.
///
/// Completions are never reported on their own; whoever drives the machine
/// pops tickets with [`RecordingPlayer::take_pending`] and reports them. Cues
/// marked with [`RecordingPlayer::fail_cue`] are refused with
/// [`SoundError::MissingCue`].
#[derive(Debug, Default)]
pub struct RecordingPlayer {
    calls: Vec<PlayerCall>,
    pending: VecDeque<PlaybackTicket>,
    failing: HashSet<CueId>,
    looping: HashSet<CueId>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_cue(&mut self, cue: impl Into<CueId>) {
        self.failing.insert(cue.into());
    }

    pub fn calls(&self) -> &[PlayerCall] {
        &self.calls
    }

    /// Number of one-shot plays requested for `cue`.
    pub fn plays_of(&self, cue: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PlayerCall::Play(id) if id.as_str() == cue))
            .count()
    }

    pub fn take_pending(&mut self) -> Option<PlaybackTicket> {
        self.pending.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_looping(&self, cue: &str) -> bool {
        self.looping.iter().any(|c| c.as_str() == cue)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl SoundPlayer for RecordingPlayer {
    fn play(&mut self, ticket: PlaybackTicket, cue: &CueId) -> Result<(), SoundError> {
        self.calls.push(PlayerCall::Play(cue.clone()));
        if self.failing.contains(cue) {
            return Err(SoundError::MissingCue(cue.clone()));
        }
        self.pending.push_back(ticket);
        Ok(())
    }

    fn stop(&mut self, cue: &CueId) {
        self.calls.push(PlayerCall::Stop(cue.clone()));
        self.looping.remove(cue);
    }

    fn play_loop(&mut self, cue: &CueId) -> Result<(), SoundError> {
        self.calls.push(PlayerCall::Loop(cue.clone()));
        if self.failing.contains(cue) {
            return Err(SoundError::MissingCue(cue.clone()));
        }
        self.looping.insert(cue.clone());
        Ok(())
    }

    fn stop_all(&mut self) {
        self.calls.push(PlayerCall::StopAll);
        self.pending.clear();
        self.looping.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn cues(first: &[&str]) -> CueSet {
        CueSet {
            first: first.iter().map(|s| CueId::new(*s)).collect(),
            second: CueId::new("tick"),
            third: CueId::new("chime"),
            attention: Some(CueId::new("alarm")),
        }
    }

    #[test]
    fn single_entry_pool_always_picks_it() {
        let set = cues(&["only"]);
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(set.pick_first(&mut rng).map(CueId::as_str), Some("only"));
        }
    }

    #[test]
    fn empty_pool_picks_nothing() {
        let set = cues(&[]);
        let mut rng = Pcg64::seed_from_u64(7);
        assert!(set.pick_first(&mut rng).is_none());
    }

    #[test]
    fn pool_draw_reaches_every_entry() {
        let set = cues(&["a", "b", "c"]);
        let mut rng = Pcg64::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(set.pick_first(&mut rng).unwrap().clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn recording_player_refuses_failing_cue() {
        let mut player = RecordingPlayer::new();
        player.fail_cue("tick");
        let err = player.play(PlaybackTicket(1), &CueId::new("tick")).unwrap_err();
        assert_eq!(err, SoundError::MissingCue(CueId::new("tick")));
        assert_eq!(player.pending_len(), 0);
        assert_eq!(player.plays_of("tick"), 1);
    }

    #[test]
    fn stop_all_drops_pending_and_loops() {
        let mut player = RecordingPlayer::new();
        player.play(PlaybackTicket(1), &CueId::new("bell")).unwrap();
        player.play_loop(&CueId::new("alarm")).unwrap();
        assert!(player.is_looping("alarm"));
        player.stop_all();
        assert!(!player.is_looping("alarm"));
        assert!(player.take_pending().is_none());
    }
}
