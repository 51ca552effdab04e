//! Request/response correlation over a link.
//!
//! The wire protocol has no request ids, so a response is matched to the
//! outstanding request by message type alone (`layout_data` answers
//! `get_layout`, and so on).  The bookkeeping lives in
//! [`statdeck_core::PendingTable`]; this module adds the async parts: a
//! oneshot channel per request and a tokio timeout.
//!
//! The owner of the link's event receiver must route every inbound message
//! through [`Correlator::on_message`] so waiting requests can complete.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use statdeck_core::protocol::{Message, MessageKind};
use statdeck_core::{CorrelationError, PendingTable};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::clock;
use crate::link::{LinkError, LinkHandle};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("link is not connected")]
    NotConnected,

    #[error("no response to {request} within {after:?}")]
    Timeout {
        request: MessageKind,
        after: Duration,
    },

    #[error("a {0} request is already in flight")]
    RequestInFlight(MessageKind),

    #[error("{0} does not expect a response")]
    NotARequest(MessageKind),

    /// The pending entry was dropped without a response, e.g. the
    /// correlator was failed during shutdown.
    #[error("link closed while waiting for a response")]
    LinkClosed,

    #[error("expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: MessageKind,
        got: MessageKind,
    },
}

impl From<CorrelationError> for RequestError {
    fn from(e: CorrelationError) -> Self {
        match e {
            CorrelationError::NotARequest(kind) => RequestError::NotARequest(kind),
            CorrelationError::RequestInFlight(kind) => RequestError::RequestInFlight(kind),
        }
    }
}

type Table = PendingTable<oneshot::Sender<Message>>;

/// Sends requests on a [`LinkHandle`] and waits for their responses.
///
/// Cheap to clone; clones share the pending table.
#[derive(Debug, Clone)]
pub struct Correlator {
    link: LinkHandle,
    pending: Arc<Mutex<Table>>,
}

impl Correlator {
    pub fn new(link: LinkHandle) -> Self {
        Self {
            link,
            pending: Arc::new(Mutex::new(PendingTable::new())),
        }
    }

    pub fn link(&self) -> &LinkHandle {
        &self.link
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends `msg` and waits up to `timeout` for its response.
    ///
    /// Dropping the returned future (an outer `select!`, a timeout, or an
    /// aborted task) removes the pending entry, so the next request of the
    /// same type is not refused.
    ///
    /// # Errors
    ///
    /// - [`RequestError::NotConnected`] if the link has no session; nothing
    ///   is sent.
    /// - [`RequestError::RequestInFlight`] if a request of the same type is
    ///   already waiting.
    /// - [`RequestError::Timeout`] if no response arrives in time.  A
    ///   response arriving later is discarded.
    pub async fn request(&self, msg: Message, timeout: Duration) -> Result<Message, RequestError> {
        let request = msg.kind();
        if !self.link.is_connected() {
            return Err(RequestError::NotConnected);
        }

        let (tx, rx) = oneshot::channel();
        let ticket = {
            let now = clock::now();
            let mut table = self.table();
            for stale in table.expire(now) {
                debug!("dropping {} that outlived its deadline", stale.request);
            }
            table.register(request, now + timeout, tx)?
        };
        let _guard = PendingGuard {
            correlator: self,
            request,
            ticket,
        };

        if let Err(e) = self.link.send(&msg) {
            return Err(match e {
                LinkError::LinkUnavailable { .. } => RequestError::NotConnected,
                LinkError::Encode(e) => {
                    warn!("could not encode {request}: {e}");
                    RequestError::NotConnected
                }
            });
        }
        debug!("sent {request}, waiting up to {:?}", timeout);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RequestError::LinkClosed),
            Err(_) => {
                warn!("{request} timed out after {:?}", timeout);
                Err(RequestError::Timeout {
                    request,
                    after: timeout,
                })
            }
        }
    }

    /// Offers an inbound message to the pending requests.
    ///
    /// Returns the message back when no request was waiting for it, so the
    /// caller can handle it as unsolicited.
    pub fn on_message(&self, msg: Message) -> Option<Message> {
        let pending = match self.table().resolve(&msg) {
            Some(pending) => pending,
            None => return Some(msg),
        };
        if pending.completion.send(msg).is_err() {
            // The requester gave up between the timeout and the cancel.
            debug!("{} arrived after its requester left", pending.response);
        }
        None
    }

    /// Fails every waiting request with [`RequestError::LinkClosed`].
    pub fn fail_all(&self) {
        let drained = self.table().drain();
        if !drained.is_empty() {
            debug!("failing {} pending request(s)", drained.len());
        }
    }

    /// Number of requests waiting for a response.
    pub fn pending(&self) -> usize {
        self.table().len()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Removes a request's pending entry when its future finishes or is dropped.
///
/// The ticket check leaves a newer request of the same type alone, and an
/// entry already taken by a response is simply gone.
struct PendingGuard<'a> {
    correlator: &'a Correlator,
    request: MessageKind,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.table().cancel(self.request, self.ticket);
    }
}
