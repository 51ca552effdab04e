//! WebSocket transports for the Display Host ↔ Display Frontend push channel.
//!
//! Each text frame carries exactly one encoded line without its trailing
//! `\n`.  The reader puts the terminator back so frames can be fed to the
//! same [`statdeck_core::LineDecoder`] as every other transport.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{accept_async, connect_async, WebSocketStream};
use tracing::{debug, info};

use super::{ChunkReader, ChunkWriter, Session, Transport};

fn ws_to_io(e: WsError) -> io::Error {
    match e {
        WsError::Io(e) => e,
        closed @ (WsError::ConnectionClosed | WsError::AlreadyClosed) => {
            io::Error::new(io::ErrorKind::ConnectionReset, closed)
        }
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

struct WsReader<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> ChunkReader for WsReader<S> {
    async fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let frame = match self.inner.next().await {
                Some(frame) => frame.map_err(ws_to_io)?,
                None => return Ok(None),
            };
            let mut bytes = match frame {
                WsMessage::Text(text) => text.into_bytes(),
                WsMessage::Binary(data) => data,
                WsMessage::Close(_) => return Ok(None),
                // Ping/pong are answered by tungstenite itself.
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };
            if bytes.last() != Some(&b'\n') {
                bytes.push(b'\n');
            }
            return Ok(Some(bytes));
        }
    }
}

struct WsWriter<S> {
    inner: SplitSink<WebSocketStream<S>, WsMessage>,
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> ChunkWriter for WsWriter<S> {
    async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let text = String::from_utf8(line.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.inner.send(WsMessage::Text(text)).await.map_err(ws_to_io)
    }

    async fn shutdown(&mut self) {
        // Closing the sink sends the close frame.
        let _ = self.inner.close().await;
    }
}

fn session_from_ws<S>(ws: WebSocketStream<S>, peer: String) -> Session
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = ws.split();
    Session {
        reader: Box::new(WsReader { inner: stream }),
        writer: Box::new(WsWriter { inner: sink }),
        peer,
    }
}

// ── Accept side (Display Host) ────────────────────────────────────────────────

/// Binds once and upgrades one accepted connection per open.
#[derive(Debug)]
pub struct WsAcceptor {
    bind_addr: SocketAddr,
    listener: Option<TcpListener>,
}

impl WsAcceptor {
    /// Creates an acceptor that binds on first [`Transport::open`].
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            listener: None,
        }
    }

    /// Binds immediately.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn bind(bind_addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        info!("push channel listening on ws://{}", listener.local_addr()?);
        Ok(Self {
            bind_addr,
            listener: Some(listener),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}

#[async_trait]
impl Transport for WsAcceptor {
    fn describe(&self) -> String {
        format!("ws-listen://{}", self.local_addr().unwrap_or(self.bind_addr))
    }

    async fn open(&mut self) -> io::Result<Session> {
        if self.listener.is_none() {
            let listener = TcpListener::bind(self.bind_addr).await?;
            info!("push channel listening on ws://{}", listener.local_addr()?);
            self.listener = Some(listener);
        }
        let listener = match &self.listener {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        };
        let (stream, peer) = listener.accept().await?;
        debug!("push channel: TCP connection from {peer}, upgrading");
        let ws = accept_async(stream).await.map_err(ws_to_io)?;
        Ok(session_from_ws(ws, peer.to_string()))
    }
}

// ── Connect side (Display Frontend) ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for WsConnector {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn open(&mut self) -> io::Result<Session> {
        let (ws, _response) = connect_async(self.url.as_str()).await.map_err(ws_to_io)?;
        Ok(session_from_ws(ws, self.url.clone()))
    }
}
