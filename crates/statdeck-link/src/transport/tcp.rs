//! TCP transports.
//!
//! [`TcpConnector`] dials a fixed address; [`TcpAcceptor`] binds once and
//! hands out one accepted peer per [`Transport::open`] call.  The acceptor
//! serves a single peer at a time: while a session is live the link driver
//! is not calling `open`, so a second client waits in the listen backlog
//! until the first one leaves.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use super::{Session, StreamReader, StreamWriter, Transport};

fn session_from_stream(stream: TcpStream, peer: String) -> io::Result<Session> {
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    Ok(Session {
        reader: Box::new(StreamReader::new(read_half)),
        writer: Box::new(StreamWriter::new(write_half)),
        peer,
    })
}

/// Client side: connects to `addr` on every open.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl Transport for TcpConnector {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    async fn open(&mut self) -> io::Result<Session> {
        let stream = TcpStream::connect(self.addr).await?;
        session_from_stream(stream, self.addr.to_string())
    }
}

/// Server side: binds lazily, then accepts one peer per open.
#[derive(Debug)]
pub struct TcpAcceptor {
    bind_addr: SocketAddr,
    listener: Option<TcpListener>,
}

impl TcpAcceptor {
    /// Creates an acceptor that binds on first [`Transport::open`].
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            listener: None,
        }
    }

    /// Binds immediately, so callers learn about a busy port at startup.
    ///
    /// Binding port 0 picks a free port; see [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn bind(bind_addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        info!("listening on tcp://{}", listener.local_addr()?);
        Ok(Self {
            bind_addr,
            listener: Some(listener),
        })
    }

    /// The bound address, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}

#[async_trait]
impl Transport for TcpAcceptor {
    fn describe(&self) -> String {
        format!("tcp-listen://{}", self.local_addr().unwrap_or(self.bind_addr))
    }

    async fn open(&mut self) -> io::Result<Session> {
        if self.listener.is_none() {
            let listener = TcpListener::bind(self.bind_addr).await?;
            info!("listening on tcp://{}", listener.local_addr()?);
            self.listener = Some(listener);
        }
        let listener = match &self.listener {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        };
        let (stream, peer) = listener.accept().await?;
        info!("accepted connection from {peer}");
        session_from_stream(stream, peer.to_string())
    }
}
