//! Connection state machine shared by every transport link.
//!
//! ```text
//!               open()                io ok
//! Disconnected ───────► Connecting ──────────► Connected
//!      ▲                  │    ▲                   │
//!      │ close()          │    │ backoff elapsed   │ io error / peer close
//!      │ (any state)      ▼    │                   ▼
//!      └──────────────── BackoffWait ◄─────────────┘
//! ```
//!
//! The backoff delay is fixed per link: the peer is one known local device,
//! so there is nothing to gain from growing the delay.  Transition methods
//! are the only way to change the state; each returns the [`Transition`]
//! it performed so the owner can log it and raise events.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Lifecycle state of one transport link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    BackoffWait,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::BackoffWait => "backoff",
        };
        f.write_str(name)
    }
}

/// A state change performed by [`ConnectionStateMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    /// `true` only for `Connected → BackoffWait`, the single transition that
    /// raises the `disconnected` event.
    pub peer_lost: bool,
}

impl Transition {
    fn new(from: ConnectionState, to: ConnectionState) -> Self {
        Self {
            from,
            to,
            peer_lost: from == ConnectionState::Connected && to == ConnectionState::BackoffWait,
        }
    }
}

/// Errors returned for events that are not valid in the current state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("cannot apply {event} while {from}")]
    InvalidTransition {
        from: ConnectionState,
        event: &'static str,
    },

    /// `backoff_elapsed` was called before the retry delay ran out.
    #[error("backoff still pending for {remaining:?}")]
    BackoffPending { remaining: Duration },
}

/// State machine for one link.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    retry_delay: Duration,
    last_error: Option<String>,
    retry_at: Option<Instant>,
}

impl ConnectionStateMachine {
    /// Creates a machine in [`ConnectionState::Disconnected`].
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_delay,
            last_error: None,
            retry_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// The reason given to the most recent [`io_failed`](Self::io_failed).
    /// Cleared on a successful connect.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the pending backoff ends, if the machine is in `BackoffWait`.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// `Disconnected → Connecting`.
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidTransition`] from any other state.
    pub fn open(&mut self) -> Result<Transition, StateError> {
        self.expect_state(ConnectionState::Disconnected, "open")?;
        Ok(self.move_to(ConnectionState::Connecting))
    }

    /// `Connecting → Connected`.
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidTransition`] from any other state.
    pub fn io_succeeded(&mut self) -> Result<Transition, StateError> {
        self.expect_state(ConnectionState::Connecting, "io success")?;
        self.last_error = None;
        Ok(self.move_to(ConnectionState::Connected))
    }

    /// `Connecting | Connected → BackoffWait`, scheduling the retry at
    /// `now + retry_delay`.
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidTransition`] from `Disconnected` or
    /// `BackoffWait`.
    pub fn io_failed(
        &mut self,
        reason: impl Into<String>,
        now: Instant,
    ) -> Result<Transition, StateError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.last_error = Some(reason.into());
                self.retry_at = Some(now + self.retry_delay);
                Ok(self.move_to(ConnectionState::BackoffWait))
            }
            from => Err(StateError::InvalidTransition {
                from,
                event: "io error",
            }),
        }
    }

    /// `BackoffWait → Connecting` once `now` has reached the retry time.
    ///
    /// # Errors
    ///
    /// [`StateError::BackoffPending`] if called early, or
    /// [`StateError::InvalidTransition`] outside `BackoffWait`.
    pub fn backoff_elapsed(&mut self, now: Instant) -> Result<Transition, StateError> {
        self.expect_state(ConnectionState::BackoffWait, "backoff elapsed")?;
        if let Some(retry_at) = self.retry_at {
            if now < retry_at {
                return Err(StateError::BackoffPending {
                    remaining: retry_at - now,
                });
            }
        }
        self.retry_at = None;
        Ok(self.move_to(ConnectionState::Connecting))
    }

    /// Any state `→ Disconnected`, cancelling a pending retry.
    ///
    /// Never fails; closing an already closed link is a no-op transition.
    pub fn close(&mut self) -> Transition {
        self.retry_at = None;
        let from = self.state;
        self.state = ConnectionState::Disconnected;
        // Deliberate close is not a peer loss.
        Transition {
            from,
            to: ConnectionState::Disconnected,
            peer_lost: false,
        }
    }

    fn expect_state(&self, expected: ConnectionState, event: &'static str) -> Result<(), StateError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                from: self.state,
                event,
            })
        }
    }

    fn move_to(&mut self, to: ConnectionState) -> Transition {
        let transition = Transition::new(self.state, to);
        self.state = to;
        transition
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
