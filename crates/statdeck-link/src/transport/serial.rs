//! Serial link over a tty device.
//!
//! The display host exposes a USB gadget ACM port (`/dev/ttyGS0`) and the
//! relay machine sees it as `/dev/ttyACM0`.  The port is opened through
//! `tokio-serial`, which puts the tty in raw mode: no echo, no line
//! editing, no output post-processing, and no canonical line length cap.
//! Layout lines can be megabytes long and must arrive byte-for-byte.
//!
//! ACM devices ignore the baud rate, but real UARTs (and USB serial
//! adapters) need it, so it is configurable.
//!
//! When the device is absent (cable unplugged, gadget driver not loaded)
//! `open` fails with the I/O error and the link driver retries after its
//! backoff.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;

use super::{Session, StreamReader, StreamWriter, Transport};

/// Baud rate used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

#[derive(Debug, Clone)]
pub struct SerialDevice {
    path: PathBuf,
    baud_rate: u32,
}

impl SerialDevice {
    pub fn new(path: impl Into<PathBuf>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

#[async_trait]
impl Transport for SerialDevice {
    fn describe(&self) -> String {
        format!("serial://{}@{}", self.path.display(), self.baud_rate)
    }

    async fn open(&mut self) -> io::Result<Session> {
        let port = tokio_serial::new(self.path.to_string_lossy(), self.baud_rate)
            .open_native_async()
            .map_err(io::Error::from)?;
        let (read_half, write_half) = tokio::io::split(port);
        Ok(Session {
            reader: Box::new(StreamReader::new(read_half)),
            writer: Box::new(StreamWriter::new(write_half)),
            peer: self.path.display().to_string(),
        })
    }
}
