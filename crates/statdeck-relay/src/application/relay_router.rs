//! RelayRouter: the relay's message rules.
//!
//! The relay sits between two links and owns one piece of state, the most
//! recent layout seen on either side.  Everything else is forwarding.
//!
//! # Designer side
//!
//! | inbound | action |
//! |---|---|
//! | `config` | validate; cache; forward to serial; reply `config_ack` |
//! | `get_layout` | reply `layout_data` from the cache |
//! | `get_status` | reply `status` |
//! | `update_tuning` | change the stats period; reply `tuning_ack` |
//! | `stats`, `action` | forward to serial verbatim |
//!
//! # Serial side
//!
//! | inbound | action |
//! |---|---|
//! | `action`, `stats` | forward to the designer verbatim |
//! | `config_request` | answer with `config` from the cache |
//! | `layout_data` | replace the cache with the host's stored layout |
//! | `status` | remember as the host status |
//!
//! When the serial link comes up the relay asks the host for its stored
//! layout, so a `get_layout` from the designer can be answered even if the
//! designer has never pushed one in this session.
//!
//! The relay is also the telemetry source: [`RelayRouter::publish_stats`]
//! is called on every stats tick and sends one sample to the display.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use statdeck_core::protocol::{Extras, Message, Payload, StatusReport};
use statdeck_core::{ConnectionState, LayoutDocument};
use statdeck_link::{LinkEvent, MessageSink};
use tracing::{debug, info, trace, warn};

use super::telemetry::StatsSource;
use crate::domain::config::{stats_period, DEFAULT_STATS_INTERVAL_MS};

pub struct RelayRouter {
    designer: Arc<dyn MessageSink>,
    serial: Arc<dyn MessageSink>,
    layout: Option<LayoutDocument>,
    host_status: Option<StatusReport>,
    decode_errors: u64,
    stats_interval: Duration,
}

impl RelayRouter {
    pub fn new(designer: Arc<dyn MessageSink>, serial: Arc<dyn MessageSink>) -> Self {
        Self {
            designer,
            serial,
            layout: None,
            host_status: None,
            decode_errors: 0,
            stats_interval: stats_period(DEFAULT_STATS_INTERVAL_MS),
        }
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// The stats period currently in effect.
    pub fn stats_interval(&self) -> Duration {
        self.stats_interval
    }

    /// The cached layout, if any side has supplied one.
    pub fn cached_layout(&self) -> Option<&LayoutDocument> {
        self.layout.as_ref()
    }

    pub fn host_status(&self) -> Option<&StatusReport> {
        self.host_status.as_ref()
    }

    // ── Event entry points ────────────────────────────────────────────────────

    pub fn on_designer_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(msg) => self.on_designer_message(msg),
            LinkEvent::StateChanged { state, .. } => {
                debug!("designer link {state}");
            }
            LinkEvent::DecodeError(_) => self.decode_errors += 1,
        }
    }

    pub fn on_serial_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(msg) => self.on_serial_message(msg),
            LinkEvent::StateChanged { state, peer_lost } => self.on_serial_state(state, peer_lost),
            LinkEvent::DecodeError(_) => self.decode_errors += 1,
        }
    }

    // ── Designer → relay ──────────────────────────────────────────────────────

    pub fn on_designer_message(&mut self, msg: Message) {
        match msg {
            Message::Config { layout, extra } => self.handle_config(layout, extra),
            Message::GetLayout => {
                let layout = self.layout.clone().unwrap_or_default();
                self.reply(Message::LayoutData { layout });
            }
            Message::GetStatus => {
                let status = self.status_report();
                self.reply(Message::Status(status));
            }
            Message::UpdateTuning { stats_rate_ms } => {
                let requested = stats_rate_ms.unwrap_or(DEFAULT_STATS_INTERVAL_MS);
                self.stats_interval = stats_period(requested);
                let applied = self.stats_interval_ms();
                info!("stats interval set to {applied} ms");
                self.reply(Message::TuningAck {
                    success: true,
                    stats_rate_ms: Some(applied),
                });
            }
            msg @ (Message::Stats { .. } | Message::Action(_)) => {
                let _ = self.serial.send(&msg);
            }
            other => debug!("ignoring {} from designer", other.kind()),
        }
    }

    fn handle_config(&mut self, layout: LayoutDocument, extra: Extras) {
        let summary = match layout.validate() {
            Ok(summary) => summary,
            Err(e) => {
                warn!("rejecting layout from designer: {e}");
                self.reply(Message::ConfigAck {
                    success: false,
                    error: Some(e.to_string()),
                });
                return;
            }
        };
        info!(
            "layout from designer: {} page(s), {} tile(s)",
            summary.pages, summary.tiles
        );

        self.layout = Some(layout.clone());
        let ack = match self.serial.send(&Message::Config { layout, extra }) {
            Ok(()) => Message::ConfigAck {
                success: true,
                error: None,
            },
            Err(e) => Message::ConfigAck {
                success: false,
                error: Some(format!("display not reachable: {e}")),
            },
        };
        self.reply(ack);
    }

    /// Sends one sample from `source` to the display, stamped `timestamp`.
    ///
    /// Nothing is sampled while the serial link is down.
    pub fn publish_stats(&self, source: &mut dyn StatsSource, timestamp: u64) {
        if !self.serial.is_connected() {
            trace!("serial link down, skipping stats");
            return;
        }
        let data = match Payload::from_value(&source.sample()) {
            Ok(data) => data,
            Err(e) => {
                warn!("stats sample not encodable: {e}");
                return;
            }
        };
        if let Err(e) = self.serial.send(&Message::stats(data, timestamp)) {
            debug!("could not send stats: {e}");
        }
    }

    fn stats_interval_ms(&self) -> u64 {
        u64::try_from(self.stats_interval.as_millis()).unwrap_or(u64::MAX)
    }

    fn reply(&self, msg: Message) {
        if let Err(e) = self.designer.send(&msg) {
            debug!("could not answer designer: {e}");
        }
    }

    // ── Display → relay ───────────────────────────────────────────────────────

    pub fn on_serial_message(&mut self, msg: Message) {
        match msg {
            msg @ (Message::Action(_) | Message::Stats { .. }) => {
                trace!("{} from display", msg.kind());
                if !self.designer.is_connected() {
                    debug!("no designer connected, dropping {}", msg.kind());
                    return;
                }
                let _ = self.designer.send(&msg);
            }
            Message::ConfigRequest => match &self.layout {
                Some(layout) => {
                    info!("display asked for its layout, sending cached copy");
                    let _ = self.serial.send(&Message::config(layout.clone()));
                }
                None => info!("display asked for a layout but none is cached"),
            },
            Message::LayoutData { layout } => match layout.validate() {
                Ok(summary) => {
                    info!("cached layout from display ({} tile(s))", summary.tiles);
                    self.layout = Some(layout);
                }
                Err(e) => warn!("ignoring invalid layout from display: {e}"),
            },
            Message::Status(report) => {
                debug!("display status: {:?}", report.fields());
                self.host_status = Some(report);
            }
            other => debug!("ignoring {} from display", other.kind()),
        }
    }

    fn on_serial_state(&mut self, state: ConnectionState, peer_lost: bool) {
        if peer_lost {
            self.host_status = None;
        }
        if state == ConnectionState::Connected {
            // Warm the cache from the layout the display has persisted.
            let _ = self.serial.send(&Message::GetLayout);
        }
    }

    // ── Status ────────────────────────────────────────────────────────────────

    /// Builds the relay's `status` payload.
    pub fn status_report(&self) -> StatusReport {
        let host = match &self.host_status {
            Some(report) => Value::Object(report.fields().clone()),
            None => Value::Null,
        };
        StatusReport::new()
            .with("serial_connected", self.serial.is_connected())
            .with(
                "layout_tiles",
                self.layout.as_ref().map_or(0, LayoutDocument::tile_count),
            )
            .with("decode_errors", self.decode_errors)
            .with("stats_interval_ms", self.stats_interval_ms())
            .with("host_status", host)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
