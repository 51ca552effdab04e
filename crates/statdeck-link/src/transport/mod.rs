//! Byte transports for StatDeck links.
//!
//! A [`Transport`] knows how to establish one session with its peer; the
//! link driver calls [`Transport::open`] again after every failure.  For
//! listener-side transports (TCP accept, WebSocket accept) "open" means
//! "wait for the next peer to connect".
//!
//! A session is a pair of halves so the driver can read and write
//! independently:
//!
//! - [`ChunkReader`] yields raw byte chunks with no framing guarantees.
//! - [`ChunkWriter`] writes one complete encoded line at a time.
//!
//! | transport | module | used by |
//! |---|---|---|
//! | TCP connect | [`tcp::TcpConnector`] | Designer → Relay |
//! | TCP accept | [`tcp::TcpAcceptor`] | Relay (designer socket) |
//! | Serial device | [`serial::SerialDevice`] | Relay and Display Host |
//! | WebSocket accept | [`ws::WsAcceptor`] | Display Host push channel |
//! | WebSocket connect | [`ws::WsConnector`] | Display Frontend |

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub mod serial;
pub mod tcp;
pub mod ws;

/// Size of the read buffer used by stream-based readers.
pub const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Reading half of a session.
#[async_trait]
pub trait ChunkReader: Send {
    /// Waits for the next chunk of bytes.
    ///
    /// Returns `Ok(None)` when the peer closed the session cleanly.  Must be
    /// cancel-safe: the link driver polls it inside `tokio::select!`.
    async fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Writing half of a session.
#[async_trait]
pub trait ChunkWriter: Send {
    /// Writes one encoded line, including its trailing `\n`.
    async fn write_line(&mut self, line: &[u8]) -> io::Result<()>;

    /// Best-effort graceful shutdown of the session.
    async fn shutdown(&mut self) {}
}

/// An open session.
pub struct Session {
    pub reader: Box<dyn ChunkReader>,
    pub writer: Box<dyn ChunkWriter>,
    /// Human-readable peer description for logs.
    pub peer: String,
}

/// Something that can establish sessions with a peer.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Short description for logs, e.g. `tcp://127.0.0.1:5555`.
    fn describe(&self) -> String;

    /// Establishes the next session.
    ///
    /// # Errors
    ///
    /// Any I/O error; the link driver treats it as a failed connect and
    /// retries after its backoff.
    async fn open(&mut self) -> io::Result<Session>;
}

// ── Generic stream halves ─────────────────────────────────────────────────────

/// [`ChunkReader`] over any `AsyncRead`.
pub struct StreamReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; READ_CHUNK_BYTES],
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkReader for StreamReader<R> {
    async fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let n = self.inner.read(&mut self.buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(self.buf[..n].to_vec()))
        }
    }
}

/// [`ChunkWriter`] over any `AsyncWrite`.
pub struct StreamWriter<W> {
    inner: W,
}

impl<W> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ChunkWriter for StreamWriter<W> {
    async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.inner.write_all(line).await?;
        self.inner.flush().await
    }

    async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_reader_reports_eof_as_none() {
        let (client, server) = tokio::io::duplex(64);
        let mut reader = StreamReader::new(server);
        let mut writer = StreamWriter::new(client);

        writer.write_line(b"{\"type\":\"get_layout\"}\n").await.unwrap();
        let chunk = reader.read_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, b"{\"type\":\"get_layout\"}\n");

        drop(writer);
        assert!(reader.read_chunk().await.unwrap().is_none());
    }
}
