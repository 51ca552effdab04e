//! Pending-request table keyed by message kind.
//!
//! The protocol carries no request ids: a `layout_data` answers whichever
//! `get_layout` is outstanding.  That only works if at most one request of
//! each kind is in flight, so [`PendingTable::register`] refuses a second
//! one with [`CorrelationError::RequestInFlight`] instead of replacing the
//! first caller's completion.
//!
//! The table is generic over the completion handle `T` so it can be tested
//! with plain values; the async correlator stores a oneshot sender there.

use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;

use crate::protocol::messages::{Message, MessageKind};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationError {
    /// The kind has no response kind, so nothing could ever complete it.
    #[error("{0} is not a request message")]
    NotARequest(MessageKind),

    /// A request of this kind is already waiting for its response.
    #[error("a {0} request is already in flight")]
    RequestInFlight(MessageKind),
}

/// One outstanding request.
#[derive(Debug)]
pub struct PendingRequest<T> {
    pub request: MessageKind,
    pub response: MessageKind,
    pub deadline: Instant,
    pub ticket: u64,
    pub completion: T,
}

/// At most one [`PendingRequest`] per request kind.
#[derive(Debug)]
pub struct PendingTable<T> {
    entries: HashMap<MessageKind, PendingRequest<T>>,
    next_ticket: u64,
}

impl<T> PendingTable<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Records a request and returns its ticket.
    ///
    /// The ticket identifies this particular entry so a later
    /// [`cancel`](Self::cancel) cannot remove a newer request of the same
    /// kind.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::NotARequest`] for kinds without a response,
    /// [`CorrelationError::RequestInFlight`] if one is already pending.
    pub fn register(
        &mut self,
        request: MessageKind,
        deadline: Instant,
        completion: T,
    ) -> Result<u64, CorrelationError> {
        let response = request
            .expected_response()
            .ok_or(CorrelationError::NotARequest(request))?;
        if self.entries.contains_key(&request) {
            return Err(CorrelationError::RequestInFlight(request));
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.entries.insert(
            request,
            PendingRequest {
                request,
                response,
                deadline,
                ticket,
                completion,
            },
        );
        Ok(ticket)
    }

    /// Removes and returns the request that `msg` answers, if any.
    pub fn resolve(&mut self, msg: &Message) -> Option<PendingRequest<T>> {
        let kind = msg.kind();
        let request = self
            .entries
            .values()
            .find(|p| p.response == kind)
            .map(|p| p.request)?;
        self.entries.remove(&request)
    }

    /// Removes the entry for `request` only if it still carries `ticket`.
    pub fn cancel(&mut self, request: MessageKind, ticket: u64) -> Option<PendingRequest<T>> {
        match self.entries.get(&request) {
            Some(p) if p.ticket == ticket => self.entries.remove(&request),
            _ => None,
        }
    }

    /// Removes and returns every request whose deadline is at or before
    /// `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<PendingRequest<T>> {
        let expired: Vec<MessageKind> = self
            .entries
            .values()
            .filter(|p| p.deadline <= now)
            .map(|p| p.request)
            .collect();
        expired
            .into_iter()
            .filter_map(|kind| self.entries.remove(&kind))
            .collect()
    }

    /// Removes every entry, e.g. when the link is closed for good.
    pub fn drain(&mut self) -> Vec<PendingRequest<T>> {
        self.entries.drain().map(|(_, p)| p).collect()
    }

    /// Earliest deadline among pending requests.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|p| p.deadline).min()
    }

    pub fn is_pending(&self, request: MessageKind) -> bool {
        self.entries.contains_key(&request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PendingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::layout::LayoutDocument;

    fn layout_data() -> Message {
        Message::LayoutData {
            layout: LayoutDocument::empty(),
        }
    }

    #[test]
    fn test_response_resolves_matching_request() {
        // Arrange
        let now = Instant::now();
        let mut table = PendingTable::new();
        table
            .register(MessageKind::GetLayout, now + Duration::from_secs(1), "pull")
            .unwrap();

        // Act
        let resolved = table.resolve(&layout_data()).unwrap();

        // Assert
        assert_eq!(resolved.request, MessageKind::GetLayout);
        assert_eq!(resolved.completion, "pull");
        assert!(table.is_empty());
    }

    #[test]
    fn test_unrelated_message_resolves_nothing() {
        let now = Instant::now();
        let mut table = PendingTable::new();
        table
            .register(MessageKind::Config, now + Duration::from_secs(1), ())
            .unwrap();

        assert!(table.resolve(&layout_data()).is_none());
        assert!(table.resolve(&Message::GetStatus).is_none());
        assert!(table.is_pending(MessageKind::Config));
    }

    #[test]
    fn test_second_same_kind_request_is_rejected_and_first_kept() {
        let now = Instant::now();
        let mut table = PendingTable::new();
        table
            .register(MessageKind::GetLayout, now + Duration::from_secs(1), 1)
            .unwrap();

        let second = table.register(MessageKind::GetLayout, now + Duration::from_secs(5), 2);

        assert_eq!(
            second,
            Err(CorrelationError::RequestInFlight(MessageKind::GetLayout))
        );
        assert_eq!(table.resolve(&layout_data()).unwrap().completion, 1);
    }

    #[test]
    fn test_different_kinds_may_be_in_flight_together() {
        let now = Instant::now();
        let mut table = PendingTable::new();
        let deadline = now + Duration::from_secs(1);
        table.register(MessageKind::GetLayout, deadline, ()).unwrap();
        table.register(MessageKind::Config, deadline, ()).unwrap();
        table.register(MessageKind::GetStatus, deadline, ()).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_non_request_kind_cannot_be_registered() {
        let mut table: PendingTable<()> = PendingTable::new();
        assert_eq!(
            table.register(MessageKind::Stats, Instant::now(), ()),
            Err(CorrelationError::NotARequest(MessageKind::Stats))
        );
    }

    #[test]
    fn test_expire_removes_only_due_requests() {
        // Arrange
        let t0 = Instant::now();
        let mut table = PendingTable::new();
        table
            .register(MessageKind::GetLayout, t0 + Duration::from_millis(1000), "layout")
            .unwrap();
        table
            .register(MessageKind::GetStatus, t0 + Duration::from_millis(5000), "status")
            .unwrap();

        // Act / Assert
        assert!(table.expire(t0 + Duration::from_millis(999)).is_empty());
        let expired = table.expire(t0 + Duration::from_millis(1000));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].completion, "layout");
        assert_eq!(table.next_deadline(), Some(t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn test_cancel_with_stale_ticket_keeps_newer_request() {
        let now = Instant::now();
        let mut table = PendingTable::new();
        let old = table
            .register(MessageKind::GetLayout, now, "old")
            .unwrap();
        table.cancel(MessageKind::GetLayout, old).unwrap();
        let new = table
            .register(MessageKind::GetLayout, now, "new")
            .unwrap();

        assert!(table.cancel(MessageKind::GetLayout, old).is_none());
        assert_ne!(old, new);
        assert!(table.is_pending(MessageKind::GetLayout));
    }
}
