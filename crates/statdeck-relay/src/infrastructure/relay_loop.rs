//! The relay event loop.
//!
//! Both link tasks publish their events on their own channel.  The loop
//! owns the router and handles one event at a time, so the router needs no
//! locking and messages from each link are processed in arrival order.
//!
//! A third branch ticks at the router's stats period and publishes one
//! telemetry sample.  An `update_tuning` request from the designer restarts
//! the ticker at the new period.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use statdeck_link::transport::serial::SerialDevice;
use statdeck_link::transport::tcp::TcpAcceptor;
use statdeck_link::{clock, spawn_link, LinkConfig, Transport};
use thiserror::Error;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::application::{RelayRouter, StatsSource};
use crate::domain::RelayConfig;
use crate::infrastructure::system_stats::SystemStats;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The designer socket could not be bound.
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Runs the relay on the configured socket and serial device until
/// `shutdown` resolves.
///
/// The designer socket is bound up front so a busy port fails at startup.
/// A missing serial device is not an error: the serial link keeps retrying.
///
/// # Errors
///
/// Returns [`RelayError::Bind`] if the designer socket cannot be bound.
pub async fn run_relay<F>(config: &RelayConfig, shutdown: F) -> Result<(), RelayError>
where
    F: Future<Output = ()>,
{
    let acceptor = TcpAcceptor::bind(config.listen_addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.listen_addr,
            source,
        })?;
    let serial = SerialDevice::new(&config.serial_device, config.serial_baud);
    let stats: Option<Box<dyn StatsSource>> = if config.publish_stats {
        Some(Box::new(SystemStats::new()))
    } else {
        info!("stats publishing disabled");
        None
    };
    run_relay_with(acceptor, serial, stats, config, shutdown).await;
    Ok(())
}

/// Runs the relay over arbitrary transports until `shutdown` resolves.
///
/// With `stats` set, one sample is sent to the serial side every stats
/// period while that link is up.
pub async fn run_relay_with<D, S, F>(
    designer: D,
    serial: S,
    mut stats: Option<Box<dyn StatsSource>>,
    config: &RelayConfig,
    shutdown: F,
) where
    D: Transport,
    S: Transport,
    F: Future<Output = ()>,
{
    let (designer_link, mut designer_events) = spawn_link(
        designer,
        LinkConfig::new("designer", config.accept_retry()).with_max_line_bytes(config.max_line_bytes),
    );
    let (serial_link, mut serial_events) = spawn_link(
        serial,
        LinkConfig::new("serial", config.serial_retry()).with_max_line_bytes(config.max_line_bytes),
    );
    let mut router = RelayRouter::new(
        Arc::new(designer_link.clone()),
        Arc::new(serial_link.clone()),
    )
    .with_stats_interval(config.stats_interval());
    let mut stats_tick = ticker(router.stats_interval());

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("relay shutting down");
                break;
            }
            Some(event) = serial_events.recv() => router.on_serial_event(event),
            Some(event) = designer_events.recv() => {
                router.on_designer_event(event);
                if router.stats_interval() != stats_tick.period() {
                    debug!("restarting stats ticker at {:?}", router.stats_interval());
                    stats_tick = ticker(router.stats_interval());
                }
            }
            _ = stats_tick.tick(), if stats.is_some() => {
                if let Some(source) = stats.as_deref_mut() {
                    router.publish_stats(source, clock::epoch_millis());
                }
            }
            else => break,
        }
    }

    designer_link.close();
    serial_link.close();
    // Let both tasks log their final transition before returning.
    while designer_events.recv().await.is_some() {}
    while serial_events.recv().await.is_some() {}
}

fn ticker(period: Duration) -> Interval {
    let mut tick = time::interval_at(time::Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}
