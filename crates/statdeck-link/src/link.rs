//! The link driver: one task per transport link.
//!
//! [`spawn_link`] starts a task that owns a [`Transport`] and a
//! [`ConnectionStateMachine`] and loops:
//!
//! ```text
//! open ─► Connecting ─► transport.open() ─ok─► Connected ─► session (read / write)
//!            ▲                 │                               │
//!            │               error                        io error / EOF
//!            │                 ▼                               ▼
//!            └── retry_delay ── BackoffWait ◄──────────────────┘
//! ```
//!
//! Every transition is logged and published as a
//! [`LinkEvent::StateChanged`]; decoded lines are published as
//! [`LinkEvent::Message`] in arrival order.  Events go out on an unbounded
//! channel so a slow consumer never delays reading the next line.
//!
//! # Sending
//!
//! [`LinkHandle::send`] hands the encoded line to the *current session's*
//! writer.  Each session gets a fresh writer channel that is dropped when
//! the session ends, so nothing sent before a disconnect can leak into the
//! next connection.  While no session is up, `send` fails immediately with
//! [`LinkError::LinkUnavailable`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use statdeck_core::protocol::{encode_message, DecodeError, EncodeError, LineDecoder, Message};
use statdeck_core::protocol::DEFAULT_MAX_LINE_BYTES;
use statdeck_core::{ConnectionState, ConnectionStateMachine, StateError, Transition};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::clock;
use crate::transport::{Session, Transport};

/// Errors returned by [`LinkHandle::send`].
#[derive(Debug, Error)]
pub enum LinkError {
    /// The link has no live session; the message was not queued.
    #[error("link {link} is not connected")]
    LinkUnavailable { link: String },

    /// The message could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Static settings for one link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Name used in logs, e.g. `"serial"` or `"designer"`.
    pub name: String,
    /// Fixed delay between a failure and the next connect attempt.
    pub retry_delay: Duration,
    /// Line length cap for the decoder.
    pub max_line_bytes: usize,
}

impl LinkConfig {
    pub fn new(name: impl Into<String>, retry_delay: Duration) -> Self {
        Self {
            name: name.into(),
            retry_delay,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }
}

/// Events published by a link task.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The connection state machine moved to `state`.
    ///
    /// `peer_lost` is set only on `Connected → BackoffWait`, exactly once
    /// per lost session.
    StateChanged {
        state: ConnectionState,
        peer_lost: bool,
    },
    /// A line was decoded.
    Message(Message),
    /// A line could not be decoded and was dropped.
    DecodeError(DecodeError),
}

type WriterSlot = Arc<Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>>;

fn lock_slot(slot: &WriterSlot) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Vec<u8>>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle to a running link task.
///
/// The task stops when [`close`](Self::close) is called or when every
/// handle has been dropped.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    name: Arc<str>,
    writer: WriterSlot,
    state: watch::Receiver<ConnectionState>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl LinkHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state most recently published by the link task.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Sends `msg` on the current session.
    ///
    /// # Errors
    ///
    /// [`LinkError::LinkUnavailable`] when no session is up (nothing is
    /// queued), or [`LinkError::Encode`] if encoding fails.
    pub fn send(&self, msg: &Message) -> Result<(), LinkError> {
        let line = encode_message(msg)?;
        let slot = lock_slot(&self.writer);
        match slot.as_ref() {
            Some(tx) if tx.send(line).is_ok() => Ok(()),
            _ => {
                warn!("{}: dropping {} message, link not connected", self.name, msg.kind());
                Err(LinkError::LinkUnavailable {
                    link: self.name.to_string(),
                })
            }
        }
    }

    /// Stops the link: closes any session, cancels the reconnect timer,
    /// and ends the task in `Disconnected`.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Outbound side of a link as seen by the role routers.
///
/// [`LinkHandle`] is the production implementation; router tests use
/// recording doubles.
pub trait MessageSink: Send + Sync {
    /// Sends `msg` now or fails; never queues across a disconnect.
    fn send(&self, msg: &Message) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;
}

impl MessageSink for LinkHandle {
    fn send(&self, msg: &Message) -> Result<(), LinkError> {
        LinkHandle::send(self, msg)
    }

    fn is_connected(&self) -> bool {
        LinkHandle::is_connected(self)
    }
}

/// Starts the link task on the current tokio runtime.
///
/// Returns the handle and the event receiver.  The receiver yields `None`
/// once the task has stopped.
pub fn spawn_link<T: Transport>(
    transport: T,
    config: LinkConfig,
) -> (LinkHandle, mpsc::UnboundedReceiver<LinkEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let writer: WriterSlot = Arc::new(Mutex::new(None));

    let handle = LinkHandle {
        name: Arc::from(config.name.as_str()),
        writer: Arc::clone(&writer),
        state: state_rx,
        shutdown: Arc::new(shutdown_tx),
    };

    let driver = Driver {
        sm: ConnectionStateMachine::new(config.retry_delay),
        transport,
        config,
        writer,
        state_tx,
        events: events_tx,
        shutdown: shutdown_rx,
    };
    tokio::spawn(driver.run());

    (handle, events_rx)
}

// ── Driver task ───────────────────────────────────────────────────────────────

struct Driver<T> {
    transport: T,
    config: LinkConfig,
    sm: ConnectionStateMachine,
    writer: WriterSlot,
    state_tx: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<LinkEvent>,
    shutdown: watch::Receiver<bool>,
}

/// Resolves once shutdown is requested or every handle is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

impl<T: Transport> Driver<T> {
    async fn run(mut self) {
        info!("{}: starting link on {}", self.config.name, self.transport.describe());
        let opened = self.sm.open();
        self.apply(opened);

        loop {
            // Connecting
            let attempt = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                result = self.transport.open() => result,
            };

            let failure = match attempt {
                Ok(session) => match self.run_session(session).await {
                    Some(reason) => reason,
                    None => break,
                },
                Err(e) => {
                    debug!("{}: connect failed: {e}", self.config.name);
                    e.to_string()
                }
            };
            let failed = self.sm.io_failed(failure, clock::now());
            self.apply(failed);

            // BackoffWait
            let retry_at = self.sm.retry_at();
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                _ = clock::sleep_until_opt(retry_at) => {}
            }
            let elapsed = self.sm.backoff_elapsed(clock::now());
            self.apply(elapsed);
        }

        *lock_slot(&self.writer) = None;
        let closed = self.sm.close();
        self.apply(Ok(closed));
        info!("{}: link stopped", self.config.name);
    }

    /// Runs one connected session.  Returns the failure reason, or `None`
    /// if the link was closed.
    async fn run_session(&mut self, session: Session) -> Option<String> {
        let Session {
            mut reader,
            mut writer,
            peer,
        } = session;

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        *lock_slot(&self.writer) = Some(tx);
        let connected = self.sm.io_succeeded();
        self.apply(connected);
        info!("{}: connected to {peer}", self.config.name);

        let mut decoder = LineDecoder::new(self.config.max_line_bytes);
        let outcome = loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break None,
                Some(line) = rx.recv() => {
                    if let Err(e) = writer.write_line(&line).await {
                        break Some(format!("write failed: {e}"));
                    }
                }
                chunk = reader.read_chunk() => match chunk {
                    Ok(Some(bytes)) => {
                        for result in decoder.feed(&bytes) {
                            let event = match result {
                                Ok(msg) => LinkEvent::Message(msg),
                                Err(e) => LinkEvent::DecodeError(e),
                            };
                            let _ = self.events.send(event);
                        }
                    }
                    Ok(None) => break Some("peer closed the connection".to_string()),
                    Err(e) => break Some(format!("read failed: {e}")),
                },
            }
        };

        *lock_slot(&self.writer) = None;
        if outcome.is_none() {
            writer.shutdown().await;
        }
        outcome
    }

    fn apply(&mut self, result: Result<Transition, StateError>) {
        match result {
            Ok(transition) => {
                if transition.peer_lost {
                    warn!(
                        "{}: connection lost ({}); retrying in {:?}",
                        self.config.name,
                        self.sm.last_error().unwrap_or("unknown"),
                        self.sm.retry_delay()
                    );
                } else if transition.from != transition.to {
                    info!("{}: {} -> {}", self.config.name, transition.from, transition.to);
                }
                self.state_tx.send_replace(transition.to);
                let _ = self.events.send(LinkEvent::StateChanged {
                    state: transition.to,
                    peer_lost: transition.peer_lost,
                });
            }
            Err(e) => error!("{}: rejected state transition: {e}", self.config.name),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
