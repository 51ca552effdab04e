//! Starts the relay link and the task that routes its events.

use std::sync::Arc;

use statdeck_link::transport::tcp::TcpConnector;
use statdeck_link::{spawn_link, Correlator, LinkConfig, Transport};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::{
    ActionDispatcher, ActionRunner, DesignerObserver, DesignerRouter, DesignerService,
};
use crate::domain::DesignerConfig;

/// A running designer link.
///
/// The link keeps reconnecting until [`shutdown`](Self::shutdown) is
/// called; dropping the session does not stop it.
pub struct DesignerSession {
    service: DesignerService,
    task: JoinHandle<()>,
}

impl DesignerSession {
    pub fn service(&self) -> &DesignerService {
        &self.service
    }

    /// Closes the link and waits for the event task to drain.
    pub async fn shutdown(self) {
        self.service.close();
        if let Err(e) = self.task.await {
            warn!("designer event task ended abnormally: {e}");
        }
    }
}

/// Connects to the relay at `config.relay_addr`.
pub fn start_designer(
    config: &DesignerConfig,
    observer: Arc<dyn DesignerObserver>,
    runner: Arc<dyn ActionRunner>,
) -> DesignerSession {
    start_designer_with(TcpConnector::new(config.relay_addr), config, observer, runner)
}

/// Like [`start_designer`] over an arbitrary transport.
pub fn start_designer_with<T: Transport>(
    transport: T,
    config: &DesignerConfig,
    observer: Arc<dyn DesignerObserver>,
    runner: Arc<dyn ActionRunner>,
) -> DesignerSession {
    let (link, mut events) = spawn_link(
        transport,
        LinkConfig::new("relay", config.reconnect()).with_max_line_bytes(config.max_line_bytes),
    );
    let service = DesignerService::new(Correlator::new(link), config.request_timeout());
    let mut router = DesignerRouter::new(
        service.clone(),
        observer,
        ActionDispatcher::new(runner),
    );

    let task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            router.on_link_event(event);
        }
        debug!("relay link events ended");
    });

    DesignerSession { service, task }
}
