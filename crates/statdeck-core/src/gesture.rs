//! Tap / long-press classification with flood control.
//!
//! Each tile is an input surface with its own press state:
//!
//! ```text
//! Idle ──press──► Pressing ──release before threshold──► tap      ──► Idle
//!                    │
//!                    └──threshold reached──► long_press (release ignored) ──► Idle
//! ```
//!
//! Exactly one action is produced per completed gesture.  `tap` is emitted on
//! release; `long_press` is emitted as soon as the threshold passes (via
//! [`GestureDetector::poll`]) or, if the owner has not polled yet, on a
//! release that came after the threshold.
//!
//! # Flood control
//!
//! The embedded receiver at the far end of the serial link cannot absorb
//! bursts, and a queued action is worse than a dropped one.  A single
//! [`FloodGate`] shared by all surfaces enforces a minimum spacing between
//! emitted actions.  The gate is consulted *before* tracking starts: a press
//! that lands inside the cooldown is ignored entirely.  The gate records
//! the time of actual emissions only, so the cooldown is measured from sends
//! rather than from input events.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::protocol::messages::ActionType;

/// Default hold time before a press counts as a long press.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(800);

/// Default minimum spacing between emitted actions.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(300);

/// Tuning for [`GestureDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    pub long_press: Duration,
    pub cooldown: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press: DEFAULT_LONG_PRESS,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// A classified gesture ready to be sent as an `action` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    pub tile_id: String,
    pub action_type: ActionType,
}

/// Result of [`GestureDetector::press`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Tracking started; a long press becomes due at `long_press_at`.
    Tracking { long_press_at: Instant },
    /// The press fell inside the cooldown and is ignored.
    Suppressed,
    /// The surface is already pressed; the duplicate press is ignored.
    AlreadyPressed,
}

// ── Flood gate ────────────────────────────────────────────────────────────────

/// Global emission limiter.
#[derive(Debug, Clone)]
pub struct FloodGate {
    cooldown: Duration,
    last_emit: Option<Instant>,
}

impl FloodGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_emit: None,
        }
    }

    /// Whether an emission at `now` would be allowed.
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
            None => true,
        }
    }

    /// Records an emission at `now` if the gate is open.
    ///
    /// Returns `false` (and records nothing) when the cooldown has not run
    /// out yet.
    pub fn try_emit(&mut self, now: Instant) -> bool {
        if !self.is_open(now) {
            return false;
        }
        self.last_emit = Some(now);
        true
    }

    pub fn last_emit(&self) -> Option<Instant> {
        self.last_emit
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

// ── Detector ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct PressState {
    started: Instant,
    long_press_fired: bool,
}

/// Per-surface gesture state plus the shared [`FloodGate`].
#[derive(Debug, Clone)]
pub struct GestureDetector {
    long_press: Duration,
    gate: FloodGate,
    // Ordered so `poll` emits deterministically when several surfaces are due.
    surfaces: BTreeMap<String, PressState>,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            long_press: config.long_press,
            gate: FloodGate::new(config.cooldown),
            surfaces: BTreeMap::new(),
        }
    }

    /// Starts tracking a press on `tile_id`.
    pub fn press(&mut self, tile_id: &str, now: Instant) -> PressOutcome {
        if self.surfaces.contains_key(tile_id) {
            return PressOutcome::AlreadyPressed;
        }
        if !self.gate.is_open(now) {
            debug!("press on {tile_id} ignored during cooldown");
            return PressOutcome::Suppressed;
        }
        self.surfaces.insert(
            tile_id.to_string(),
            PressState {
                started: now,
                long_press_fired: false,
            },
        );
        PressOutcome::Tracking {
            long_press_at: now + self.long_press,
        }
    }

    /// Fires every long press whose threshold has passed.
    pub fn poll(&mut self, now: Instant) -> Vec<Gesture> {
        let mut fired = Vec::new();
        for (tile_id, state) in self.surfaces.iter_mut() {
            if state.long_press_fired || now < state.started + self.long_press {
                continue;
            }
            // Marked even when the gate refuses, so the release cannot turn
            // this gesture into a tap.
            state.long_press_fired = true;
            if self.gate.try_emit(now) {
                fired.push(Gesture {
                    tile_id: tile_id.clone(),
                    action_type: ActionType::LongPress,
                });
            } else {
                debug!("long press on {tile_id} suppressed by cooldown");
            }
        }
        fired
    }

    /// Ends the press on `tile_id`, returning the tap or late long press it
    /// completes.
    ///
    /// The flood gate is checked again here, not only at press time.  If
    /// another surface emitted after this press was accepted and the
    /// cooldown is still running, the gesture ends with no action at all.
    /// This is the one case besides [`cancel`](Self::cancel) where a press
    /// yields neither a tap nor a long press.
    pub fn release(&mut self, tile_id: &str, now: Instant) -> Option<Gesture> {
        let state = self.surfaces.remove(tile_id)?;
        if state.long_press_fired {
            return None;
        }
        let action_type = if now.saturating_duration_since(state.started) >= self.long_press {
            ActionType::LongPress
        } else {
            ActionType::Tap
        };
        if !self.gate.try_emit(now) {
            debug!("{action_type} on {tile_id} suppressed by cooldown");
            return None;
        }
        Some(Gesture {
            tile_id: tile_id.to_string(),
            action_type,
        })
    }

    /// Abandons the press on `tile_id` without emitting anything.
    ///
    /// Returns whether a press was being tracked.
    pub fn cancel(&mut self, tile_id: &str) -> bool {
        self.surfaces.remove(tile_id).is_some()
    }

    /// Abandons every tracked press, e.g. when the layout is replaced.
    pub fn cancel_all(&mut self) {
        self.surfaces.clear();
    }

    /// Earliest time at which [`poll`](Self::poll) could fire a long press.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.surfaces
            .values()
            .filter(|s| !s.long_press_fired)
            .map(|s| s.started + self.long_press)
            .min()
    }

    pub fn is_pressed(&self, tile_id: &str) -> bool {
        self.surfaces.contains_key(tile_id)
    }

    pub fn gate(&self) -> &FloodGate {
        &self.gate
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
