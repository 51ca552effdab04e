//! Telemetry liveness watchdog.
//!
//! A transport can stay open while the producer behind it has stalled.  The
//! watchdog is re-armed by every accepted `stats` message; if its timeout
//! passes with no new `stats`, the owner treats the peer as disconnected,
//! exactly as if the transport had closed.
//!
//! The watchdog knows nothing about transports.  Owners call
//! [`Watchdog::reset`] when their link reconnects so that a timer armed for
//! the old session cannot fire during the new one.

use std::time::{Duration, Instant};

/// Default silence allowed between `stats` messages.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    deadline: Option<Instant>,
    live: bool,
}

impl Watchdog {
    /// Creates a disarmed watchdog; the peer starts out not live.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
            live: false,
        }
    }

    /// Records a `stats` message at `now` and re-arms the timer.
    ///
    /// Returns `true` if this restores liveness after a loss (or is the
    /// first feed), so the owner can clear its "disconnected" state.
    pub fn feed(&mut self, now: Instant) -> bool {
        self.deadline = Some(now + self.timeout);
        let restored = !self.live;
        self.live = true;
        restored
    }

    /// Returns `true` exactly once when the timer has run out.
    ///
    /// The watchdog disarms itself after firing; the next [`feed`](Self::feed)
    /// re-arms it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.live = false;
                true
            }
            _ => false,
        }
    }

    /// Disarms the timer and forgets liveness.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.live = false;
    }

    /// When the timer will fire, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_WATCHDOG_TIMEOUT)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
