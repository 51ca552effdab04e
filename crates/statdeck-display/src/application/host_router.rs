//! HostRouter: the display host's message rules.
//!
//! The host sits between the serial link (relay side) and the WebSocket push
//! channel (frontend side).  It owns:
//!
//! - the current layout, loaded from the [`LayoutStore`] at startup and
//!   replaced by every valid `config` from the relay,
//! - a [`Watchdog`] on the relay's `stats` stream.
//!
//! The frontend is told about a lost PC exactly once per loss, whether the
//! serial link dropped or the telemetry simply went quiet.  The flag is
//! cleared by the next `stats` message.

use std::sync::Arc;
use std::time::Instant;

use statdeck_core::protocol::{Message, StatusReport, TileAction};
use statdeck_core::{ConnectionState, LayoutDocument, Watchdog};
use statdeck_link::{LinkEvent, MessageSink};
use tracing::{debug, error, info, trace, warn};

use super::layout_store::LayoutStore;

pub struct HostRouter {
    serial: Arc<dyn MessageSink>,
    frontend: Arc<dyn MessageSink>,
    store: Arc<dyn LayoutStore>,
    layout: LayoutDocument,
    watchdog: Watchdog,
    loss_reported: bool,
    wall_clock: fn() -> u64,
}

impl HostRouter {
    /// Creates the router and loads the stored layout.
    ///
    /// An unreadable or invalid stored layout is logged and replaced by an
    /// empty one, so the host asks the relay for a fresh copy.
    pub fn new(
        serial: Arc<dyn MessageSink>,
        frontend: Arc<dyn MessageSink>,
        store: Arc<dyn LayoutStore>,
        watchdog: Watchdog,
    ) -> Self {
        let layout = match store.load() {
            Ok(Some(layout)) => {
                info!("loaded stored layout ({} tile(s))", layout.tile_count());
                layout
            }
            Ok(None) => {
                info!("no stored layout yet");
                LayoutDocument::empty()
            }
            Err(e) => {
                warn!("ignoring stored layout: {e}");
                LayoutDocument::empty()
            }
        };
        Self {
            serial,
            frontend,
            store,
            layout,
            watchdog,
            loss_reported: false,
            wall_clock: statdeck_link::clock::epoch_millis,
        }
    }

    /// Replaces the wall clock used for `timestamp` fields.
    pub fn with_wall_clock(mut self, wall_clock: fn() -> u64) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    pub fn layout(&self) -> &LayoutDocument {
        &self.layout
    }

    /// The earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watchdog.deadline()
    }

    /// Runs timers that are due at `now`.
    pub fn poll(&mut self, now: Instant) {
        if self.watchdog.poll(now) {
            warn!("no stats for {:?}, treating PC as disconnected", self.watchdog.timeout());
            self.report_loss();
        }
    }

    // ── Serial (relay) side ───────────────────────────────────────────────────

    pub fn on_serial_event(&mut self, event: LinkEvent, now: Instant) {
        match event {
            LinkEvent::Message(msg) => self.on_serial_message(msg, now),
            LinkEvent::StateChanged { state, peer_lost } => {
                if peer_lost {
                    self.watchdog.reset();
                    self.report_loss();
                }
                if state == ConnectionState::Connected && self.layout.tile_count() == 0 {
                    info!("no layout stored, asking the relay for one");
                    let _ = self.serial.send(&Message::ConfigRequest);
                }
            }
            LinkEvent::DecodeError(_) => {}
        }
    }

    pub fn on_serial_message(&mut self, msg: Message, now: Instant) {
        match msg {
            Message::Config { layout, .. } => self.apply_layout(layout),
            Message::Stats {
                data,
                timestamp,
                extra,
            } => {
                trace!("stats at {timestamp}");
                if self.watchdog.feed(now) && self.loss_reported {
                    info!("stats resumed");
                }
                self.loss_reported = false;
                self.push(&Message::Stats {
                    data,
                    timestamp,
                    extra,
                });
            }
            Message::GetLayout => {
                let _ = self.serial.send(&Message::LayoutData {
                    layout: self.layout.clone(),
                });
            }
            other => debug!("ignoring {} from relay", other.kind()),
        }
    }

    fn apply_layout(&mut self, layout: LayoutDocument) {
        let summary = match layout.validate() {
            Ok(summary) => summary,
            Err(e) => {
                warn!("ignoring invalid layout from relay: {e}");
                return;
            }
        };
        info!(
            "new layout: {} page(s), {} tile(s)",
            summary.pages, summary.tiles
        );
        if let Err(e) = self.store.save(&layout) {
            error!("could not persist layout: {e}");
        }
        self.layout = layout;
        self.push(&Message::config(self.layout.clone()));
    }

    fn report_loss(&mut self) {
        if self.loss_reported {
            return;
        }
        self.loss_reported = true;
        self.push(&Message::PcDisconnected);
    }

    /// Sends to the frontend if one is connected.
    fn push(&self, msg: &Message) {
        if self.frontend.is_connected() {
            let _ = self.frontend.send(msg);
        } else {
            trace!("no frontend connected, not pushing {}", msg.kind());
        }
    }

    // ── Frontend side ─────────────────────────────────────────────────────────

    pub fn on_frontend_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(msg) => self.on_frontend_message(msg),
            LinkEvent::StateChanged {
                state: ConnectionState::Connected,
                ..
            } => {
                info!("frontend connected, sending current layout");
                self.push(&Message::config(self.layout.clone()));
                if self.loss_reported {
                    self.push(&Message::PcDisconnected);
                }
            }
            LinkEvent::StateChanged { .. } | LinkEvent::DecodeError(_) => {}
        }
    }

    pub fn on_frontend_message(&mut self, msg: Message) {
        match msg {
            Message::Action(action) => {
                let restamped = Message::Action(TileAction {
                    timestamp: (self.wall_clock)(),
                    ..action
                });
                if let Err(e) = self.serial.send(&restamped) {
                    warn!("dropping action: {e}");
                }
            }
            other => debug!("ignoring {} from frontend", other.kind()),
        }
    }

    // ── Status ────────────────────────────────────────────────────────────────

    pub fn status_report(&self) -> StatusReport {
        let tiles = self.layout.tile_count();
        StatusReport::new()
            .with("config_loaded", tiles > 0)
            .with("tiles_active", tiles)
            .with("frontend_connected", self.frontend.is_connected())
            .with("timestamp", (self.wall_clock)())
    }

    /// Sends the periodic `status` report to the relay.
    pub fn send_status(&self) {
        if self.serial.is_connected() {
            let _ = self.serial.send(&Message::Status(self.status_report()));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::Value;
    use statdeck_core::{ActionType, Extras, Payload};
    use statdeck_link::LinkError;

    use super::*;
    use crate::application::layout_store::StoreError;

    struct RecordingSink {
        connected: AtomicBool,
        sent: Mutex<Vec<Message>>,
    }

    impl RecordingSink {
        fn new(connected: bool) -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(connected),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<Message> {
            self.sent.lock().unwrap().clone()
        }

        fn count(&self, kind: statdeck_core::MessageKind) -> usize {
            self.sent().iter().filter(|m| m.kind() == kind).count()
        }
    }

    impl MessageSink for RecordingSink {
        fn send(&self, msg: &Message) -> Result<(), LinkError> {
            if !self.connected.load(Ordering::SeqCst) {
                return Err(LinkError::LinkUnavailable {
                    link: "test".to_string(),
                });
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<LayoutDocument>>,
    }

    impl LayoutStore for MemoryStore {
        fn load(&self) -> Result<Option<LayoutDocument>, StoreError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, layout: &LayoutDocument) -> Result<(), StoreError> {
            *self.saved.lock().unwrap() = Some(layout.clone());
            Ok(())
        }
    }

    const WATCHDOG: Duration = Duration::from_millis(3000);
    const ONE_TILE: &str = r#"{"pages":[{"tiles":[{"id":"cpu"}]}]}"#;

    struct Fixture {
        router: HostRouter,
        serial: Arc<RecordingSink>,
        frontend: Arc<RecordingSink>,
        store: Arc<MemoryStore>,
        t0: Instant,
    }

    fn fixture(stored: Option<&str>) -> Fixture {
        let serial = RecordingSink::new(true);
        let frontend = RecordingSink::new(true);
        let store = Arc::new(MemoryStore::default());
        if let Some(json) = stored {
            *store.saved.lock().unwrap() = Some(LayoutDocument::from_json(json).unwrap());
        }
        let router = HostRouter::new(
            serial.clone(),
            frontend.clone(),
            store.clone(),
            Watchdog::new(WATCHDOG),
        )
        .with_wall_clock(|| 1_700_000_000_000);
        Fixture {
            router,
            serial,
            frontend,
            store,
            t0: Instant::now(),
        }
    }

    fn stats(ts: u64) -> Message {
        Message::stats(Payload::from_json(r#"{"cpu":{"usage":12}}"#).unwrap(), ts)
    }

    #[test]
    fn test_config_is_persisted_and_pushed() {
        // Arrange
        let mut f = fixture(None);
        let layout = LayoutDocument::from_json(ONE_TILE).unwrap();

        // Act
        f.router
            .on_serial_message(Message::config(layout.clone()), f.t0);

        // Assert
        assert_eq!(f.store.load().unwrap(), Some(layout.clone()));
        assert_eq!(f.frontend.sent(), vec![Message::config(layout)]);
    }

    #[test]
    fn test_invalid_config_is_not_persisted() {
        let mut f = fixture(None);
        let bad = LayoutDocument::from_json(r#"{"pages":[{"tiles":[{"name":"x"}]}]}"#).unwrap();

        f.router.on_serial_message(Message::config(bad), f.t0);

        assert_eq!(f.store.load().unwrap(), None);
        assert!(f.frontend.sent().is_empty());
    }

    #[test]
    fn test_get_layout_answered_with_stored_layout() {
        let mut f = fixture(Some(ONE_TILE));

        f.router.on_serial_message(Message::GetLayout, f.t0);

        assert_eq!(
            f.serial.sent(),
            vec![Message::LayoutData {
                layout: LayoutDocument::from_json(ONE_TILE).unwrap()
            }]
        );
    }

    #[test]
    fn test_serial_connect_with_empty_layout_requests_config() {
        let mut f = fixture(None);

        f.router.on_serial_event(
            LinkEvent::StateChanged {
                state: ConnectionState::Connected,
                peer_lost: false,
            },
            f.t0,
        );

        assert_eq!(f.serial.sent(), vec![Message::ConfigRequest]);
    }

    #[test]
    fn test_serial_connect_with_stored_layout_stays_quiet() {
        let mut f = fixture(Some(ONE_TILE));

        f.router.on_serial_event(
            LinkEvent::StateChanged {
                state: ConnectionState::Connected,
                peer_lost: false,
            },
            f.t0,
        );

        assert!(f.serial.sent().is_empty());
    }

    #[test]
    fn test_watchdog_fires_once_at_deadline() {
        // Arrange: stats at t=0 and t=1000 then silence
        let mut f = fixture(Some(ONE_TILE));
        f.router.on_serial_message(stats(0), f.t0);
        f.router
            .on_serial_message(stats(1000), f.t0 + Duration::from_millis(1000));

        // Act / Assert
        f.router.poll(f.t0 + Duration::from_millis(3999));
        assert_eq!(f.frontend.count(statdeck_core::MessageKind::PcDisconnected), 0);
        f.router.poll(f.t0 + Duration::from_millis(4000));
        assert_eq!(f.frontend.count(statdeck_core::MessageKind::PcDisconnected), 1);
        f.router.poll(f.t0 + Duration::from_millis(9000));
        assert_eq!(f.frontend.count(statdeck_core::MessageKind::PcDisconnected), 1);
    }

    #[test]
    fn test_link_loss_and_watchdog_report_loss_once() {
        // Arrange
        let mut f = fixture(Some(ONE_TILE));
        f.router.on_serial_message(stats(0), f.t0);

        // Act: the serial link drops, then the (reset) watchdog is polled
        f.router.on_serial_event(
            LinkEvent::StateChanged {
                state: ConnectionState::BackoffWait,
                peer_lost: true,
            },
            f.t0 + Duration::from_millis(500),
        );
        f.router.poll(f.t0 + Duration::from_millis(10_000));

        // Assert
        assert_eq!(f.frontend.count(statdeck_core::MessageKind::PcDisconnected), 1);
        assert!(f.router.next_deadline().is_none());
    }

    #[test]
    fn test_stats_after_loss_rearm_reporting() {
        let mut f = fixture(Some(ONE_TILE));
        f.router.on_serial_message(stats(0), f.t0);
        f.router.poll(f.t0 + WATCHDOG);

        f.router
            .on_serial_message(stats(5000), f.t0 + Duration::from_millis(5000));
        f.router.poll(f.t0 + Duration::from_millis(8000));

        assert_eq!(f.frontend.count(statdeck_core::MessageKind::PcDisconnected), 2);
    }

    #[test]
    fn test_frontend_connect_receives_current_layout() {
        let mut f = fixture(Some(ONE_TILE));

        f.router.on_frontend_event(LinkEvent::StateChanged {
            state: ConnectionState::Connected,
            peer_lost: false,
        });

        assert_eq!(
            f.frontend.sent(),
            vec![Message::config(LayoutDocument::from_json(ONE_TILE).unwrap())]
        );
    }

    #[test]
    fn test_frontend_action_forwarded_with_fresh_timestamp() {
        let mut f = fixture(Some(ONE_TILE));

        f.router
            .on_frontend_message(Message::action("cpu", ActionType::Tap, 5));

        assert_eq!(
            f.serial.sent(),
            vec![Message::action("cpu", ActionType::Tap, 1_700_000_000_000)]
        );
    }

    #[test]
    fn test_restamped_action_keeps_extra_fields() {
        // Arrange
        let mut f = fixture(Some(ONE_TILE));
        let extra = Extras::new().with("page", Payload::from_json("2").unwrap());
        let action = TileAction {
            tile_id: "cpu".to_string(),
            action_type: ActionType::LongPress,
            timestamp: 5,
            extra: extra.clone(),
        };

        // Act
        f.router.on_frontend_message(Message::Action(action));

        // Assert
        assert_eq!(
            f.serial.sent(),
            vec![Message::Action(TileAction {
                tile_id: "cpu".to_string(),
                action_type: ActionType::LongPress,
                timestamp: 1_700_000_000_000,
                extra,
            })]
        );
    }

    #[test]
    fn test_stats_extra_fields_reach_frontend() {
        let mut f = fixture(Some(ONE_TILE));
        let msg = Message::Stats {
            data: Payload::empty_object(),
            timestamp: 9,
            extra: Extras::new().with("seq", Payload::from_json("41").unwrap()),
        };

        f.router.on_serial_message(msg.clone(), f.t0);

        assert_eq!(f.frontend.sent(), vec![msg]);
    }

    #[test]
    fn test_status_report_fields() {
        let f = fixture(Some(ONE_TILE));

        let status = f.router.status_report();

        assert_eq!(status.get("config_loaded"), Some(&Value::Bool(true)));
        assert_eq!(status.get("tiles_active"), Some(&Value::from(1)));
        assert_eq!(status.get("frontend_connected"), Some(&Value::Bool(true)));
        assert_eq!(status.get("timestamp"), Some(&Value::from(1_700_000_000_000u64)));
    }
}
