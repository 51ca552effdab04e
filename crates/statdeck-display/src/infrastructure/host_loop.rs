//! The display host event loop.
//!
//! Two link tasks (serial to the relay, WebSocket push channel to the
//! frontend) feed one loop that owns the [`HostRouter`].  The loop also
//! drives the router's watchdog and the periodic status report.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use statdeck_core::Watchdog;
use statdeck_link::transport::serial::SerialDevice;
use statdeck_link::transport::ws::WsAcceptor;
use statdeck_link::{clock, spawn_link, LinkConfig, Transport};
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::application::{HostRouter, LayoutStore};
use crate::domain::DisplayConfig;
use crate::infrastructure::file_store::FileLayoutStore;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("could not listen for the frontend on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Runs the host on the configured serial device and push address.
///
/// # Errors
///
/// Returns [`HostError::Bind`] if the push channel cannot be bound.
pub async fn run_host<F>(config: &DisplayConfig, shutdown: F) -> Result<(), HostError>
where
    F: Future<Output = ()>,
{
    let push = WsAcceptor::bind(config.push_listen_addr)
        .await
        .map_err(|source| HostError::Bind {
            addr: config.push_listen_addr,
            source,
        })?;
    let serial = SerialDevice::new(&config.serial_device, config.serial_baud);
    let store = Arc::new(FileLayoutStore::new(&config.layout_path));
    run_host_with(serial, push, store, config, shutdown).await;
    Ok(())
}

/// Runs the host over arbitrary transports and store until `shutdown`
/// resolves.
pub async fn run_host_with<S, P, F>(
    serial: S,
    push: P,
    store: Arc<dyn LayoutStore>,
    config: &DisplayConfig,
    shutdown: F,
) where
    S: Transport,
    P: Transport,
    F: Future<Output = ()>,
{
    let (serial_link, mut serial_events) = spawn_link(
        serial,
        LinkConfig::new("serial", config.serial_retry()).with_max_line_bytes(config.max_line_bytes),
    );
    let (push_link, mut push_events) = spawn_link(
        push,
        LinkConfig::new("frontend", config.accept_retry()).with_max_line_bytes(config.max_line_bytes),
    );
    let mut router = HostRouter::new(
        Arc::new(serial_link.clone()),
        Arc::new(push_link.clone()),
        store,
        Watchdog::new(config.watchdog()),
    );

    let period = config.status_interval();
    let mut status = time::interval_at(time::Instant::now() + period, period);
    status.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);
    loop {
        let deadline = router.next_deadline();
        tokio::select! {
            _ = &mut shutdown => {
                info!("display host shutting down");
                break;
            }
            Some(event) = serial_events.recv() => router.on_serial_event(event, clock::now()),
            Some(event) = push_events.recv() => router.on_frontend_event(event),
            _ = clock::sleep_until_opt(deadline) => router.poll(clock::now()),
            _ = status.tick() => router.send_status(),
        }
    }

    serial_link.close();
    push_link.close();
    while serial_events.recv().await.is_some() {}
    while push_events.recv().await.is_some() {}
}
