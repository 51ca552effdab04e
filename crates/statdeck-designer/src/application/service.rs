//! DesignerService: the designer's requests to the relay.
//!
//! Each call sends one request and waits for the matching response through
//! the [`Correlator`].  A failed or timed-out request is never re-sent; the
//! caller decides whether to try again.
//!
//! The service also remembers the last layout that was successfully pushed
//! or pulled.  Inbound actions are resolved against it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use statdeck_core::protocol::{Message, MessageKind};
use statdeck_core::{ConnectionState, LayoutDocument, LayoutError, StatusReport};
use statdeck_link::{Correlator, LinkHandle, RequestError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DesignerError {
    /// The layout failed validation and was not sent.
    #[error("layout not sent: {0}")]
    InvalidLayout(#[from] LayoutError),

    /// The relay answered `config_ack` with `success: false`.
    #[error("relay rejected the layout: {0}")]
    ConfigRejected(String),

    #[error("relay rejected the tuning request")]
    TuningRejected,

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Cheap to clone; clones share the link and the remembered layout.
#[derive(Debug, Clone)]
pub struct DesignerService {
    correlator: Correlator,
    timeout: Duration,
    layout: Arc<Mutex<Option<LayoutDocument>>>,
}

impl DesignerService {
    pub fn new(correlator: Correlator, request_timeout: Duration) -> Self {
        Self {
            correlator,
            timeout: request_timeout,
            layout: Arc::new(Mutex::new(None)),
        }
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn link(&self) -> &LinkHandle {
        self.correlator.link()
    }

    pub fn is_connected(&self) -> bool {
        self.link().is_connected()
    }

    /// Waits until the relay link is up.
    ///
    /// # Errors
    ///
    /// [`RequestError::NotConnected`] if it is not up within `timeout` or the
    /// link has stopped.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), DesignerError> {
        let mut state = self.link().watch_state();
        let result = match tokio::time::timeout(
            timeout,
            state.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(RequestError::NotConnected.into()),
        };
        result
    }

    /// Pushes `layout` to the display through the relay.
    ///
    /// # Errors
    ///
    /// - [`DesignerError::InvalidLayout`] if the layout fails validation;
    ///   nothing is sent.
    /// - [`DesignerError::ConfigRejected`] with the relay's error text.
    /// - [`DesignerError::Request`] for link-level failures.
    pub async fn send_config(&self, layout: LayoutDocument) -> Result<(), DesignerError> {
        let summary = layout.validate()?;
        let response = self
            .correlator
            .request(Message::config(layout.clone()), self.timeout)
            .await?;
        match response {
            Message::ConfigAck { success: true, .. } => {
                info!("layout accepted ({} tile(s))", summary.tiles);
                self.remember_layout(layout);
                Ok(())
            }
            Message::ConfigAck {
                success: false,
                error,
            } => Err(DesignerError::ConfigRejected(
                error.unwrap_or_else(|| "no reason given".to_string()),
            )),
            other => Err(unexpected(MessageKind::ConfigAck, &other)),
        }
    }

    /// Reads back the layout the relay holds.
    ///
    /// An empty answer does not replace the remembered layout.
    pub async fn get_layout(&self) -> Result<LayoutDocument, DesignerError> {
        match self.correlator.request(Message::GetLayout, self.timeout).await? {
            Message::LayoutData { layout } => {
                if layout.tile_count() > 0 {
                    self.remember_layout(layout.clone());
                }
                Ok(layout)
            }
            other => Err(unexpected(MessageKind::LayoutData, &other)),
        }
    }

    /// Asks the relay for its diagnostic report.
    pub async fn get_status(&self) -> Result<StatusReport, DesignerError> {
        match self.correlator.request(Message::GetStatus, self.timeout).await? {
            Message::Status(report) => Ok(report),
            other => Err(unexpected(MessageKind::Status, &other)),
        }
    }

    /// Changes how often the relay publishes stats.
    ///
    /// Returns the period the relay applied, which is raised to its minimum
    /// when `stats_rate_ms` is too small.
    pub async fn update_tuning(&self, stats_rate_ms: u64) -> Result<u64, DesignerError> {
        let request = Message::UpdateTuning {
            stats_rate_ms: Some(stats_rate_ms),
        };
        match self.correlator.request(request, self.timeout).await? {
            Message::TuningAck {
                success: true,
                stats_rate_ms: applied,
            } => Ok(applied.unwrap_or(stats_rate_ms)),
            Message::TuningAck { success: false, .. } => Err(DesignerError::TuningRejected),
            other => Err(unexpected(MessageKind::TuningAck, &other)),
        }
    }

    /// The last layout pushed or pulled successfully.
    pub fn last_layout(&self) -> Option<LayoutDocument> {
        self.layout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets the layout used to resolve actions without pushing it.
    pub fn remember_layout(&self, layout: LayoutDocument) {
        *self.layout.lock().unwrap_or_else(PoisonError::into_inner) = Some(layout);
    }

    /// Fails waiting requests and stops the link task.
    pub fn close(&self) {
        self.correlator.fail_all();
        self.link().close();
    }
}

fn unexpected(expected: MessageKind, got: &Message) -> DesignerError {
    RequestError::UnexpectedResponse {
        expected,
        got: got.kind(),
    }
    .into()
}
