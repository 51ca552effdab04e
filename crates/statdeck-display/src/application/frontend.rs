//! FrontendController: the touchscreen side of the push channel.
//!
//! Inbound, it turns push-channel messages into [`DisplayObserver`] calls
//! and tracks whether the PC is reachable.  Outbound, it runs raw touch
//! input through the [`GestureDetector`] and sends each classified gesture
//! as an `action` message.
//!
//! "Disconnected" has three causes that the observer cannot tell apart:
//! the push channel dropped, the host sent `pc_disconnected`, or the
//! frontend's own watchdog saw no `stats` in time.  The observer is told
//! once per loss and once per recovery.
//!
//! Actions are never queued.  If the push channel is down when a gesture
//! completes, the action is dropped with a warning.

use std::sync::Arc;
use std::time::Instant;

use statdeck_core::protocol::{Message, Payload};
use statdeck_core::{
    ConnectionState, Gesture, GestureConfig, GestureDetector, LayoutDocument, PressOutcome,
    Watchdog,
};
use statdeck_link::{LinkEvent, MessageSink};
use tracing::{debug, info, warn};

use crate::domain::InputEvent;

/// Receives what the frontend learns from the host.
///
/// Implemented by the rendering layer; calls are made on the frontend's
/// event loop and must return quickly.
pub trait DisplayObserver: Send + Sync {
    fn on_config_received(&self, layout: &LayoutDocument);

    fn on_stats_received(&self, data: &Payload, timestamp: u64);

    fn on_connection_state_changed(&self, connected: bool);
}

pub struct FrontendController {
    link: Arc<dyn MessageSink>,
    observer: Arc<dyn DisplayObserver>,
    gestures: GestureDetector,
    watchdog: Watchdog,
    connected: bool,
    wall_clock: fn() -> u64,
}

impl FrontendController {
    pub fn new(
        link: Arc<dyn MessageSink>,
        observer: Arc<dyn DisplayObserver>,
        gesture: GestureConfig,
        watchdog: Watchdog,
    ) -> Self {
        Self {
            link,
            observer,
            gestures: GestureDetector::new(gesture),
            watchdog,
            connected: false,
            wall_clock: statdeck_link::clock::epoch_millis,
        }
    }

    pub fn with_wall_clock(mut self, wall_clock: fn() -> u64) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    /// Whether the observer was last told "connected".
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.gestures.next_deadline(), self.watchdog.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fires due long presses and the watchdog.
    pub fn poll(&mut self, now: Instant) {
        for gesture in self.gestures.poll(now) {
            self.emit(gesture);
        }
        if self.watchdog.poll(now) {
            warn!("no stats for {:?}", self.watchdog.timeout());
            self.set_connected(false);
        }
    }

    // ── Push channel ──────────────────────────────────────────────────────────

    pub fn on_link_event(&mut self, event: LinkEvent, now: Instant) {
        match event {
            LinkEvent::Message(msg) => self.on_message(msg, now),
            LinkEvent::StateChanged { state, peer_lost } => {
                if peer_lost || state == ConnectionState::Disconnected {
                    self.watchdog.reset();
                    self.gestures.cancel_all();
                    self.set_connected(false);
                }
            }
            LinkEvent::DecodeError(_) => {}
        }
    }

    pub fn on_message(&mut self, msg: Message, now: Instant) {
        match msg {
            Message::Config { layout, .. } => {
                info!("layout received ({} tile(s))", layout.tile_count());
                self.observer.on_config_received(&layout);
            }
            Message::Stats { data, timestamp, .. } => {
                self.watchdog.feed(now);
                self.set_connected(true);
                self.observer.on_stats_received(&data, timestamp);
            }
            Message::PcDisconnected => {
                self.watchdog.reset();
                self.set_connected(false);
            }
            other => debug!("ignoring {} from host", other.kind()),
        }
    }

    fn set_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        info!("PC {}", if connected { "connected" } else { "disconnected" });
        self.observer.on_connection_state_changed(connected);
    }

    // ── Touch input ───────────────────────────────────────────────────────────

    pub fn on_input(&mut self, input: InputEvent, now: Instant) {
        match input {
            InputEvent::Press { tile_id } => {
                if let PressOutcome::Suppressed = self.gestures.press(&tile_id, now) {
                    debug!("press on {tile_id} suppressed by cooldown");
                }
            }
            InputEvent::Release { tile_id } => {
                if let Some(gesture) = self.gestures.release(&tile_id, now) {
                    self.emit(gesture);
                }
            }
            InputEvent::Cancel { tile_id } => {
                self.gestures.cancel(&tile_id);
            }
        }
    }

    fn emit(&self, gesture: Gesture) {
        let msg = Message::action(gesture.tile_id, gesture.action_type, (self.wall_clock)());
        match self.link.send(&msg) {
            Ok(()) => debug!("sent {:?}", msg),
            Err(e) => warn!("dropping action: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
