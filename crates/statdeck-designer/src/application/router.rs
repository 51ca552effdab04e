//! DesignerRouter: handles everything the relay link delivers.
//!
//! Responses go to the [`Correlator`](statdeck_link::Correlator) first.
//! What is left is unsolicited traffic from the display: `action` (observer
//! plus dispatcher) and `stats` (observer).

use std::sync::Arc;

use statdeck_core::protocol::{Message, Payload};
use statdeck_core::{ActionType, ConnectionState};
use statdeck_link::LinkEvent;
use tracing::{debug, trace};

use super::dispatch::ActionDispatcher;
use super::service::DesignerService;

/// Receives what the designer learns from the display.
pub trait DesignerObserver: Send + Sync {
    fn on_action_received(&self, tile_id: &str, action_type: ActionType);

    fn on_stats_received(&self, data: &Payload, timestamp: u64);

    /// Called on every change of the relay link; push-dependent UI should be
    /// disabled while this is `false`.
    fn on_connection_state_changed(&self, connected: bool);
}

pub struct DesignerRouter {
    service: DesignerService,
    observer: Arc<dyn DesignerObserver>,
    dispatcher: ActionDispatcher,
    connected: bool,
}

impl DesignerRouter {
    pub fn new(
        service: DesignerService,
        observer: Arc<dyn DesignerObserver>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            service,
            observer,
            dispatcher,
            connected: false,
        }
    }

    pub fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(msg) => {
                if let Some(msg) = self.service.correlator().on_message(msg) {
                    self.on_unsolicited(msg);
                }
            }
            LinkEvent::StateChanged { state, peer_lost } => {
                if peer_lost || state == ConnectionState::Disconnected {
                    self.service.correlator().fail_all();
                }
                let connected = state == ConnectionState::Connected;
                if connected != self.connected {
                    self.connected = connected;
                    self.observer.on_connection_state_changed(connected);
                }
            }
            LinkEvent::DecodeError(_) => {}
        }
    }

    fn on_unsolicited(&self, msg: Message) {
        match msg {
            Message::Action(action) => {
                self.observer
                    .on_action_received(&action.tile_id, action.action_type);
                let layout = self.service.last_layout();
                self.dispatcher.dispatch(layout.as_ref(), &action);
            }
            Message::Stats { data, timestamp, .. } => {
                trace!("stats at {timestamp}");
                self.observer.on_stats_received(&data, timestamp);
            }
            other => debug!("ignoring unsolicited {}", other.kind()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
