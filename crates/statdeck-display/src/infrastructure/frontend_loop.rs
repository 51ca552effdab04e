//! The display frontend event loop.

use std::future::Future;
use std::sync::Arc;

use statdeck_core::Watchdog;
use statdeck_link::transport::ws::WsConnector;
use statdeck_link::{clock, spawn_link, LinkConfig, Transport};
use tokio::sync::mpsc;
use tracing::info;

use crate::application::{DisplayObserver, FrontendController};
use crate::domain::{DisplayConfig, InputEvent};

/// Connects to the host's push channel at `config.push_url`.
pub async fn run_frontend<F>(
    config: &DisplayConfig,
    observer: Arc<dyn DisplayObserver>,
    input: mpsc::UnboundedReceiver<InputEvent>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let push = WsConnector::new(config.push_url.clone());
    run_frontend_with(push, observer, input, config, shutdown).await;
}

/// Runs the frontend over an arbitrary transport until `shutdown` resolves.
///
/// Touch input arrives on `input`; a closed input channel is not a reason
/// to stop, the frontend keeps showing telemetry.
pub async fn run_frontend_with<T, F>(
    push: T,
    observer: Arc<dyn DisplayObserver>,
    mut input: mpsc::UnboundedReceiver<InputEvent>,
    config: &DisplayConfig,
    shutdown: F,
) where
    T: Transport,
    F: Future<Output = ()>,
{
    let (link, mut events) = spawn_link(
        push,
        LinkConfig::new("push", config.push_retry()).with_max_line_bytes(config.max_line_bytes),
    );
    let mut controller = FrontendController::new(
        Arc::new(link.clone()),
        observer,
        config.gesture(),
        Watchdog::new(config.watchdog()),
    );

    tokio::pin!(shutdown);
    loop {
        let deadline = controller.next_deadline();
        tokio::select! {
            _ = &mut shutdown => {
                info!("display frontend shutting down");
                break;
            }
            Some(event) = events.recv() => controller.on_link_event(event, clock::now()),
            Some(event) = input.recv() => controller.on_input(event, clock::now()),
            _ = clock::sleep_until_opt(deadline) => controller.poll(clock::now()),
        }
    }

    link.close();
    while events.recv().await.is_some() {}
}
