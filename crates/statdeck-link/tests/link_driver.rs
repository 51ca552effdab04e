//! Link driver and correlator behaviour against an in-memory transport.
//!
//! All tests run on tokio's paused clock, so backoff delays and request
//! timeouts are measured exactly without real waiting.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use statdeck_core::protocol::Message;
use statdeck_core::{ConnectionState, LayoutDocument};
use statdeck_link::clock;
use statdeck_link::transport::{StreamReader, StreamWriter};
use statdeck_link::{
    spawn_link, Correlator, LinkConfig, LinkEvent, LinkHandle, RequestError, Session, Transport,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

const RETRY: Duration = Duration::from_millis(3000);

// ── Test double ───────────────────────────────────────────────────────────────

/// Hands the far end of an in-memory pipe to the test on every open.
struct PipeTransport {
    peers: mpsc::UnboundedSender<DuplexStream>,
    opens: Arc<Mutex<Vec<Instant>>>,
    refuse: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for PipeTransport {
    fn describe(&self) -> String {
        "pipe".to_string()
    }

    async fn open(&mut self) -> io::Result<Session> {
        self.opens.lock().unwrap().push(clock::now());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        let (near, far) = tokio::io::duplex(64 * 1024);
        let _ = self.peers.send(far);
        let (read_half, write_half) = tokio::io::split(near);
        Ok(Session {
            reader: Box::new(StreamReader::new(read_half)),
            writer: Box::new(StreamWriter::new(write_half)),
            peer: "pipe".to_string(),
        })
    }
}

struct Harness {
    link: LinkHandle,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    peers: mpsc::UnboundedReceiver<DuplexStream>,
    opens: Arc<Mutex<Vec<Instant>>>,
}

fn start(refuse: bool) -> Harness {
    let (peers_tx, peers) = mpsc::unbounded_channel();
    let opens = Arc::new(Mutex::new(Vec::new()));
    let transport = PipeTransport {
        peers: peers_tx,
        opens: Arc::clone(&opens),
        refuse: Arc::new(AtomicBool::new(refuse)),
    };
    let (link, events) = spawn_link(transport, LinkConfig::new("test", RETRY));
    Harness {
        link,
        events,
        peers,
        opens,
    }
}

async fn next_state(events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> (ConnectionState, bool) {
    loop {
        match events.recv().await {
            Some(LinkEvent::StateChanged { state, peer_lost }) => return (state, peer_lost),
            Some(_) => continue,
            None => panic!("link task ended"),
        }
    }
}

async fn wait_for_state(events: &mut mpsc::UnboundedReceiver<LinkEvent>, wanted: ConnectionState) -> bool {
    loop {
        let (state, peer_lost) = next_state(events).await;
        if state == wanted {
            return peer_lost;
        }
    }
}

// ── Link driver ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_failed_connects_are_retried_after_fixed_delay() {
    // Arrange
    let mut h = start(true);

    // Act: let three attempts fail
    for _ in 0..3 {
        wait_for_state(&mut h.events, ConnectionState::BackoffWait).await;
    }
    h.link.close();

    // Assert: no attempt happens sooner than the retry delay
    let opens = h.opens.lock().unwrap().clone();
    assert!(opens.len() >= 3);
    for pair in opens.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= RETRY, "reconnected after only {:?}", gap);
        assert!(gap < RETRY + Duration::from_millis(100));
    }
}

#[tokio::test(start_paused = true)]
async fn test_peer_loss_reported_once_then_reconnects() {
    // Arrange
    let mut h = start(false);
    assert!(!wait_for_state(&mut h.events, ConnectionState::Connected).await);
    let peer = h.peers.recv().await.unwrap();

    // Act
    drop(peer);
    let lost_at = clock::now();

    // Assert
    assert_eq!(next_state(&mut h.events).await, (ConnectionState::BackoffWait, true));
    assert_eq!(next_state(&mut h.events).await, (ConnectionState::Connecting, false));
    assert!(clock::now() - lost_at >= RETRY);
    assert_eq!(next_state(&mut h.events).await, (ConnectionState::Connected, false));
    h.link.close();
}

#[tokio::test(start_paused = true)]
async fn test_inbound_lines_decoded_in_order_and_corrupt_line_isolated() {
    // Arrange
    let mut h = start(false);
    wait_for_state(&mut h.events, ConnectionState::Connected).await;
    let mut peer = h.peers.recv().await.unwrap();

    // Act: split the second message across two writes
    peer.write_all(b"{\"type\":\"get_layout\"}\nnot json\n{\"type\":\"get_")
        .await
        .unwrap();
    peer.write_all(b"status\"}\n").await.unwrap();

    // Assert
    let mut seen = Vec::new();
    while seen.len() < 3 {
        match h.events.recv().await.unwrap() {
            LinkEvent::Message(msg) => seen.push(Some(msg)),
            LinkEvent::DecodeError(_) => seen.push(None),
            LinkEvent::StateChanged { .. } => {}
        }
    }
    assert_eq!(
        seen,
        vec![Some(Message::GetLayout), None, Some(Message::GetStatus)]
    );
    h.link.close();
}

#[tokio::test(start_paused = true)]
async fn test_send_reaches_peer_while_connected() {
    let mut h = start(false);
    wait_for_state(&mut h.events, ConnectionState::Connected).await;
    let peer = h.peers.recv().await.unwrap();
    let mut lines = BufReader::new(peer).lines();

    h.link.send(&Message::ConfigRequest).unwrap();

    let line = lines.next_line().await.unwrap().unwrap();
    assert_eq!(line, r#"{"type":"config_request"}"#);
    h.link.close();
}

#[tokio::test(start_paused = true)]
async fn test_send_after_peer_loss_fails_without_queueing() {
    // Arrange
    let mut h = start(false);
    wait_for_state(&mut h.events, ConnectionState::Connected).await;
    let peer = h.peers.recv().await.unwrap();
    drop(peer);
    wait_for_state(&mut h.events, ConnectionState::BackoffWait).await;

    // Act
    let result = h.link.send(&Message::GetStatus);

    // Assert: rejected now, and the next session starts clean
    assert!(result.is_err());
    wait_for_state(&mut h.events, ConnectionState::Connected).await;
    let peer = h.peers.recv().await.unwrap();
    h.link.send(&Message::GetLayout).unwrap();
    let mut lines = BufReader::new(peer).lines();
    assert_eq!(
        lines.next_line().await.unwrap().unwrap(),
        r#"{"type":"get_layout"}"#
    );
    h.link.close();
}

// ── Correlator ────────────────────────────────────────────────────────────────

/// Routes inbound messages through the correlator, like a role's event loop.
fn route(correlator: &Correlator, mut events: mpsc::UnboundedReceiver<LinkEvent>) {
    let correlator = correlator.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let LinkEvent::Message(msg) = event {
                correlator.on_message(msg);
            }
        }
    });
}

async fn connected_correlator() -> (Correlator, DuplexStream) {
    let mut h = start(false);
    wait_for_state(&mut h.events, ConnectionState::Connected).await;
    let peer = h.peers.recv().await.unwrap();
    let correlator = Correlator::new(h.link.clone());
    route(&correlator, h.events);
    (correlator, peer)
}

#[tokio::test(start_paused = true)]
async fn test_request_resolves_with_matching_response() {
    // Arrange
    let (correlator, peer) = connected_correlator().await;
    let (read_half, mut write_half) = tokio::io::split(peer);
    let mut lines = BufReader::new(read_half).lines();

    // Act
    let request = tokio::spawn({
        let correlator = correlator.clone();
        async move {
            correlator
                .request(Message::GetLayout, Duration::from_millis(1000))
                .await
        }
    });
    assert_eq!(
        lines.next_line().await.unwrap().unwrap(),
        r#"{"type":"get_layout"}"#
    );
    write_half
        .write_all(b"{\"type\":\"layout_data\",\"layout\":{\"pages\":[]}}\n")
        .await
        .unwrap();

    // Assert
    let response = request.await.unwrap().unwrap();
    assert_eq!(
        response,
        Message::LayoutData {
            layout: LayoutDocument::empty()
        }
    );
    assert_eq!(correlator.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_request_times_out_at_deadline_and_not_before() {
    // Arrange
    let (correlator, _peer) = connected_correlator().await;
    let started = clock::now();

    // Act
    let request = tokio::spawn({
        let correlator = correlator.clone();
        async move {
            correlator
                .request(Message::GetLayout, Duration::from_millis(1000))
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(999)).await;

    // Assert
    assert!(!request.is_finished());
    let result = request.await.unwrap();
    assert_eq!(
        result,
        Err(RequestError::Timeout {
            request: statdeck_core::MessageKind::GetLayout,
            after: Duration::from_millis(1000)
        })
    );
    assert!(clock::now() - started >= Duration::from_millis(1000));
    assert_eq!(correlator.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_request_frees_its_slot() {
    // Arrange: a caller that gives up long before the request's own timeout
    let (correlator, _peer) = connected_correlator().await;
    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        correlator.request(Message::GetLayout, Duration::from_secs(10)),
    )
    .await;
    assert!(abandoned.is_err());

    // Act
    let pending_after_abandon = correlator.pending();
    let next = tokio::spawn({
        let correlator = correlator.clone();
        async move {
            correlator
                .request(Message::GetLayout, Duration::from_millis(500))
                .await
        }
    });

    // Assert: the second request is sent and runs to its own timeout
    assert_eq!(pending_after_abandon, 0);
    assert_eq!(
        next.await.unwrap(),
        Err(RequestError::Timeout {
            request: statdeck_core::MessageKind::GetLayout,
            after: Duration::from_millis(500)
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_aborted_request_task_frees_its_slot() {
    let (correlator, _peer) = connected_correlator().await;
    let task = tokio::spawn({
        let correlator = correlator.clone();
        async move {
            correlator
                .request(Message::GetStatus, Duration::from_secs(60))
                .await
        }
    });
    while correlator.pending() == 0 {
        tokio::task::yield_now().await;
    }

    task.abort();
    let _ = task.await;

    assert_eq!(correlator.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_request_of_same_type_is_rejected() {
    // Arrange
    let (correlator, _peer) = connected_correlator().await;
    let _first = tokio::spawn({
        let correlator = correlator.clone();
        async move {
            correlator
                .request(Message::GetStatus, Duration::from_millis(1000))
                .await
        }
    });
    while correlator.pending() == 0 {
        tokio::task::yield_now().await;
    }

    // Act
    let second = correlator
        .request(Message::GetStatus, Duration::from_millis(1000))
        .await;

    // Assert
    assert_eq!(
        second,
        Err(RequestError::RequestInFlight(statdeck_core::MessageKind::GetStatus))
    );
}

#[tokio::test(start_paused = true)]
async fn test_request_while_disconnected_fails_immediately() {
    let h = start(true);
    let correlator = Correlator::new(h.link.clone());
    let started = clock::now();

    let result = correlator
        .request(Message::GetLayout, Duration::from_millis(1000))
        .await;

    assert_eq!(result, Err(RequestError::NotConnected));
    assert_eq!(clock::now(), started);
    h.link.close();
}

#[tokio::test(start_paused = true)]
async fn test_unsolicited_message_is_handed_back() {
    let h = start(true);
    let correlator = Correlator::new(h.link.clone());

    let returned = correlator.on_message(Message::PcDisconnected);

    assert_eq!(returned, Some(Message::PcDisconnected));
}
