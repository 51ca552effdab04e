//! End-to-end relay flow: a real TCP designer socket and an in-memory pipe
//! standing in for the serial device.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use statdeck_link::transport::tcp::TcpAcceptor;
use statdeck_link::transport::{StreamReader, StreamWriter};
use statdeck_link::{Session, Transport};
use statdeck_relay::application::StatsSource;
use statdeck_relay::domain::RelayConfig;
use statdeck_relay::infrastructure::run_relay_with;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

/// Serial stand-in: each open hands the display's end of a pipe to the test.
struct PipeSerial {
    display_ends: mpsc::UnboundedSender<DuplexStream>,
}

#[async_trait]
impl Transport for PipeSerial {
    fn describe(&self) -> String {
        "pipe-serial".to_string()
    }

    async fn open(&mut self) -> io::Result<Session> {
        let (relay_end, display_end) = tokio::io::duplex(64 * 1024);
        let _ = self.display_ends.send(display_end);
        let (read_half, write_half) = tokio::io::split(relay_end);
        Ok(Session {
            reader: Box::new(StreamReader::new(read_half)),
            writer: Box::new(StreamWriter::new(write_half)),
            peer: "display".to_string(),
        })
    }
}

/// Reports the same reading every time.
struct FixedStats;

impl StatsSource for FixedStats {
    fn sample(&mut self) -> serde_json::Value {
        serde_json::json!({ "cpu": { "usage": 7.5 } })
    }
}

async fn next_line<R: tokio::io::AsyncBufRead + Unpin>(lines: &mut tokio::io::Lines<R>) -> String {
    tokio::time::timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("timed out waiting for a line")
        .unwrap()
        .expect("stream closed")
}

#[tokio::test]
async fn test_config_push_and_action_return_path() {
    // Arrange: relay on an ephemeral port with a pipe for the serial link
    let acceptor = TcpAcceptor::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = acceptor.local_addr().unwrap();
    let (display_tx, mut display_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let config = RelayConfig::default();
    let relay = tokio::spawn(async move {
        let serial = PipeSerial {
            display_ends: display_tx,
        };
        run_relay_with(acceptor, serial, None, &config, async {
            let _ = stop_rx.await;
        })
        .await;
    });

    let display = display_rx.recv().await.unwrap();
    let (display_read, mut display_write) = tokio::io::split(display);
    let mut display_lines = BufReader::new(display_read).lines();
    // The relay warms its cache as soon as the serial link is up.
    assert_eq!(next_line(&mut display_lines).await, r#"{"type":"get_layout"}"#);

    let designer = TcpStream::connect(addr).await.unwrap();
    let (designer_read, mut designer_write) = designer.into_split();
    let mut designer_lines = BufReader::new(designer_read).lines();

    // Act 1: designer pushes a layout
    let config_line =
        r#"{"type":"config","layout":{"pages":[{"grid":{"cols":3},"tiles":[{"id":"cpu","type":"gauge"}]}]}}"#;
    designer_write
        .write_all(format!("{config_line}\n").as_bytes())
        .await
        .unwrap();

    // Assert 1: forwarded byte-for-byte and acknowledged
    assert_eq!(next_line(&mut display_lines).await, config_line);
    assert_eq!(
        next_line(&mut designer_lines).await,
        r#"{"type":"config_ack","success":true}"#
    );

    // Act 2: a tap on the display
    let action_line = r#"{"type":"action","tile_id":"cpu","action_type":"tap","timestamp":1700000000000}"#;
    display_write
        .write_all(format!("{action_line}\n").as_bytes())
        .await
        .unwrap();

    // Assert 2
    assert_eq!(next_line(&mut designer_lines).await, action_line);

    // Act 3: the designer reads the layout back
    designer_write
        .write_all(b"{\"type\":\"get_layout\"}\n")
        .await
        .unwrap();

    // Assert 3
    assert_eq!(
        next_line(&mut designer_lines).await,
        format!(
            r#"{{"type":"layout_data","layout":{}}}"#,
            r#"{"pages":[{"grid":{"cols":3},"tiles":[{"id":"cpu","type":"gauge"}]}]}"#
        )
    );

    let _ = stop_tx.send(());
    relay.await.unwrap();
}

#[tokio::test]
async fn test_corrupt_designer_line_does_not_break_session() {
    // Arrange
    let acceptor = TcpAcceptor::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = acceptor.local_addr().unwrap();
    let (display_tx, _display_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let config = RelayConfig::default();
    let relay = tokio::spawn(async move {
        let serial = PipeSerial {
            display_ends: display_tx,
        };
        run_relay_with(acceptor, serial, None, &config, async {
            let _ = stop_rx.await;
        })
        .await;
    });
    let designer = TcpStream::connect(addr).await.unwrap();
    let (designer_read, mut designer_write) = designer.into_split();
    let mut designer_lines = BufReader::new(designer_read).lines();

    // Act
    designer_write
        .write_all(b"{\"type\":\"config\",\"layout\":\n{\"type\":\"get_status\"}\n")
        .await
        .unwrap();

    // Assert: the broken line is dropped, the next one is answered
    let reply = next_line(&mut designer_lines).await;
    assert!(reply.starts_with(r#"{"type":"status""#), "got {reply}");
    assert!(reply.contains(r#""decode_errors":1"#));

    let _ = stop_tx.send(());
    relay.await.unwrap();
}

#[tokio::test]
async fn test_stats_published_to_display_and_retuned() {
    // Arrange: relay with a fixed telemetry source at the minimum period
    let acceptor = TcpAcceptor::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = acceptor.local_addr().unwrap();
    let (display_tx, mut display_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let config = RelayConfig {
        stats_interval_ms: 100,
        ..RelayConfig::default()
    };
    let relay = tokio::spawn(async move {
        let serial = PipeSerial {
            display_ends: display_tx,
        };
        let stats: Box<dyn StatsSource> = Box::new(FixedStats);
        run_relay_with(acceptor, serial, Some(stats), &config, async {
            let _ = stop_rx.await;
        })
        .await;
    });
    let display = display_rx.recv().await.unwrap();
    let (display_read, _display_write) = tokio::io::split(display);
    let mut display_lines = BufReader::new(display_read).lines();

    // Act 1: wait for a sample on the serial side
    let mut stats_line = next_line(&mut display_lines).await;
    while !stats_line.starts_with(r#"{"type":"stats""#) {
        stats_line = next_line(&mut display_lines).await;
    }

    // Assert 1
    assert!(
        stats_line.starts_with(r#"{"type":"stats","data":{"cpu":{"usage":7.5}},"timestamp":"#),
        "got {stats_line}"
    );

    // Act 2: the designer asks for a faster rate than allowed
    let designer = TcpStream::connect(addr).await.unwrap();
    let (designer_read, mut designer_write) = designer.into_split();
    let mut designer_lines = BufReader::new(designer_read).lines();
    designer_write
        .write_all(b"{\"type\":\"update_tuning\",\"stats_rate_ms\":20}\n")
        .await
        .unwrap();

    // Assert 2: clamped to the minimum and acknowledged
    assert_eq!(
        next_line(&mut designer_lines).await,
        r#"{"type":"tuning_ack","success":true,"stats_rate_ms":100}"#
    );

    let _ = stop_tx.send(());
    relay.await.unwrap();
}
