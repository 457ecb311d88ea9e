//! Edge-triggered motion detector with a cooldown.
//!
//! A conversation is started only on a fresh motion edge (no motion on the
//! previous tick, motion now) and only once the cooldown since the last
//! trigger has fully elapsed:
//!
//! ```text
//!            motion edge, cooldown elapsed
//!   Armed ───────────────────────────────► FlagActive ──settle──► Cooldown
//!     ▲                                                             │
//!     └─────────────── cooldown elapsed, motion absent ─────────────┘
//! ```
//!
//! Motion that is merely held (1 → 1) never fires, and neither does an edge
//! that lands inside the cooldown window. `previous_motion` is updated on
//! every tick whatever the outcome.

mod signaler;

pub use signaler::{FlagSignaler, pulse};

use std::time::Duration;

/// Outcome of evaluating one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// New motion edge outside the cooldown: start a conversation.
    Fire,
    /// Motion present but not allowed to fire.
    Suppressed(SuppressReason),
    /// No motion.
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Motion was already present on the previous tick.
    MotionHeld,
    /// New edge, but the last trigger was too recent.
    Cooldown { remaining: Duration },
}

/// Coarse state for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    /// Motion absent and no cooldown running: the next edge fires.
    Armed,
    /// Motion is being held; nothing fires until it drops.
    MotionHeld,
    /// A trigger fired recently.
    Cooldown,
    /// The flag reads `start_conversation` and its reset is still pending.
    FlagActive,
}

/// Process-local detector state. Not persisted: a restart forgets the
/// cooldown.
#[derive(Debug, Clone)]
pub struct TriggerState {
    previous_motion: bool,
    last_trigger: Option<Duration>,
    cooldown: Duration,
}

impl TriggerState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            previous_motion: false,
            last_trigger: None,
            cooldown,
        }
    }

    pub fn previous_motion(&self) -> bool {
        self.previous_motion
    }

    pub fn last_trigger(&self) -> Option<Duration> {
        self.last_trigger
    }

    /// Evaluate one tick with the current motion reading at time `now`.
    pub fn evaluate(&mut self, motion: bool, now: Duration) -> TriggerDecision {
        let decision = if !motion {
            TriggerDecision::Quiet
        } else if self.previous_motion {
            TriggerDecision::Suppressed(SuppressReason::MotionHeld)
        } else {
            match self.cooldown_remaining(now) {
                None => {
                    self.last_trigger = Some(now);
                    TriggerDecision::Fire
                }
                Some(remaining) => {
                    TriggerDecision::Suppressed(SuppressReason::Cooldown { remaining })
                }
            }
        };

        self.previous_motion = motion;
        decision
    }

    /// Time left before another trigger is allowed, `None` if one may fire.
    ///
    /// The elapsed time must strictly exceed the cooldown.
    pub fn cooldown_remaining(&self, now: Duration) -> Option<Duration> {
        let last = self.last_trigger?;
        let since = now.saturating_sub(last);
        if since > self.cooldown {
            None
        } else {
            Some(self.cooldown - since)
        }
    }

    pub fn phase(&self, now: Duration) -> TriggerPhase {
        if self.cooldown_remaining(now).is_some() {
            TriggerPhase::Cooldown
        } else if self.previous_motion {
            TriggerPhase::MotionHeld
        } else {
            TriggerPhase::Armed
        }
    }
}
