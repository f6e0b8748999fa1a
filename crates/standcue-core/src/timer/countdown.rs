//! Session countdown.
//!
//! Two counters run side by side: seconds until the session ends and seconds
//! until the next prompt. Like the rest of the core, the timer has no thread;
//! the caller hands it the current monotonic instant through `advance()` and
//! asks `next_deadline()` when to wake up next.
//!
//! ## Tick policy
//!
//! ```text
//! session > 0           -> session -= 1; at 0 mark ended (once) -> SessionEnded
//! !ended && prompt > 0  -> prompt -= 1
//! !ended && prompt == 0 && no sequence -> CountdownZero
//! ```
//!
//! Session end is marked on the tick that takes the session counter to 0,
//! not on the tick after it.
//!
//! Deadlines are re-armed from the previous deadline rather than from the
//! wake-up instant, so late wake-ups do not accumulate drift.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// What a tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Session time just ran out. Reported exactly once per session.
    SessionEnded,
    /// The prompt countdown reached zero.
    CountdownZero,
}

#[derive(Debug, Clone, Default)]
pub struct CountdownTimer {
    session_secs_remaining: u64,
    next_prompt_secs_remaining: u64,
    session_ended: bool,
    /// Set while a cue sequence owns the session; no ticks are processed.
    suspended: bool,
    next_tick_at: Option<Instant>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_secs_remaining(&self) -> u64 {
        self.session_secs_remaining
    }

    pub fn next_prompt_secs_remaining(&self) -> u64 {
        self.next_prompt_secs_remaining
    }

    pub fn session_ended(&self) -> bool {
        self.session_ended
    }

    pub fn is_active(&self) -> bool {
        self.next_tick_at.is_some() || self.suspended
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_tick_at
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, session_secs: u64, first_interval_secs: u64, now: Instant) {
        self.session_secs_remaining = session_secs;
        self.next_prompt_secs_remaining = first_interval_secs;
        self.session_ended = false;
        self.suspended = false;
        self.next_tick_at = Some(now + ONE_SECOND);
    }

    pub fn stop(&mut self) {
        *self = Self::default();
    }

    /// Freeze both counters while a cue sequence runs.
    pub fn suspend(&mut self) {
        if self.is_active() {
            self.suspended = true;
            self.next_tick_at = None;
        }
    }

    /// Restart the prompt countdown with a fresh interval and resume ticking.
    pub fn resume(&mut self, interval_secs: u64, now: Instant) {
        if !self.is_active() {
            return;
        }
        self.next_prompt_secs_remaining = interval_secs;
        self.suspended = false;
        self.next_tick_at = Some(now + ONE_SECOND);
    }

    /// Process every whole second that has elapsed up to `now`.
    ///
    /// Stops at the first tick that produces an outcome; the caller is expected
    /// to suspend the timer in response, which discards the remaining backlog.
    pub fn advance(&mut self, now: Instant, sequence_in_progress: bool) -> Option<TickOutcome> {
        while let Some(at) = self.next_tick_at {
            if now < at || sequence_in_progress || self.suspended {
                break;
            }
            self.next_tick_at = Some(at + ONE_SECOND);
            if let Some(outcome) = self.tick(sequence_in_progress) {
                return Some(outcome);
            }
        }
        None
    }

    /// Apply the tick policy once.
    pub fn tick(&mut self, sequence_in_progress: bool) -> Option<TickOutcome> {
        if sequence_in_progress || self.suspended {
            return None;
        }

        if self.session_secs_remaining > 0 {
            self.session_secs_remaining -= 1;
        }
        if self.session_secs_remaining == 0 && !self.session_ended {
            self.session_ended = true;
            return Some(TickOutcome::SessionEnded);
        }
        if self.session_ended {
            return None;
        }

        if self.next_prompt_secs_remaining > 0 {
            self.next_prompt_secs_remaining -= 1;
        }
        if self.next_prompt_secs_remaining == 0 {
            return Some(TickOutcome::CountdownZero);
        }
        None
    }
}
