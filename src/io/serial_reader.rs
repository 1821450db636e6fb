//! Serial RFID reader loop
//!
//! Protocol:
//! - Baud: configurable (default 9600), 8N1
//! - One tag per line, UTF-8 text. A line ends at `\n` or when a read
//!   times out with bytes pending, so readers that only send CR or ETX
//!   still produce one line per scan
//! - Readers often wrap the tag in framing bytes (STX/ETX, CR); tag
//!   cleaning strips them
//! - A line is cut at `MAX_LINE_BYTES`
//!
//! The loop never retries: open, read, decode and log-write failures end it
//! with a `ReaderError` for the caller to report.

use crate::infra::config::Config;
use crate::io::scan_log::ScanLogError;
use crate::services::scan_processor::ScanProcessor;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::watch;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace, warn};

const LINE_CAPACITY: usize = 64;
/// Longest line buffered before it is handed on; tags are at most 16 chars
pub const MAX_LINE_BYTES: usize = 256;

/// Why the loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// Shutdown was signalled
    Shutdown,
    /// The input stream reached EOF (stdin or an in-memory source)
    EndOfStream,
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("failed to open serial port {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("serial read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("serial line is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Log(#[from] ScanLogError),
}

pub struct SerialReader {
    device: String,
    baud: u32,
    read_timeout: Duration,
    poll_interval: Duration,
}

/// True when a shutdown watch update means "stop" (or the sender is gone)
fn should_stop(changed: Result<(), watch::error::RecvError>, shutdown: &watch::Receiver<bool>) -> bool {
    changed.is_err() || *shutdown.borrow()
}

impl SerialReader {
    pub fn new(config: &Config) -> Self {
        Self {
            device: config.serial_device().to_string(),
            baud: config.serial_baud(),
            read_timeout: Duration::from_millis(config.read_timeout_ms()),
            poll_interval: Duration::from_millis(config.poll_interval_ms()),
        }
    }

    /// Override the per-read timeout and the pause between reads
    pub fn with_timings(mut self, read_timeout: Duration, poll_interval: Duration) -> Self {
        self.read_timeout = read_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Open the serial port and read from it until shutdown or failure
    pub async fn run(
        &self,
        processor: &mut ScanProcessor,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ReaderExit, ReaderError> {
        info!(
            device = %self.device,
            baud = %self.baud,
            read_timeout_ms = %self.read_timeout.as_millis(),
            poll_interval_ms = %self.poll_interval.as_millis(),
            "serial_reader_started"
        );

        let port = tokio_serial::new(&self.device, self.baud)
            .timeout(self.read_timeout)
            .open_native_async()
            .map_err(|source| ReaderError::Open { device: self.device.clone(), source })?;
        info!(device = %self.device, "serial_port_opened");

        self.read_lines(port, processor, shutdown).await
    }

    /// Read lines from any byte stream and feed them to the processor
    ///
    /// A read that times out hands whatever bytes arrived on as a line, the
    /// same as a `\n`. An idle timeout with nothing buffered is not an error.
    pub async fn read_lines<R>(
        &self,
        stream: R,
        processor: &mut ScanProcessor,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ReaderExit, ReaderError>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::with_capacity(LINE_CAPACITY);

        loop {
            if *shutdown.borrow() {
                info!("serial_reader_shutdown");
                return Ok(ReaderExit::Shutdown);
            }

            // `line` is always shorter than the cap here, so the limit is never zero
            let remaining = (MAX_LINE_BYTES - line.len()) as u64;
            let mut limited = (&mut reader).take(remaining);
            let read = tokio::select! {
                changed = shutdown.changed() => {
                    if should_stop(changed, &shutdown) {
                        info!("serial_reader_shutdown");
                        return Ok(ReaderExit::Shutdown);
                    }
                    continue;
                }
                read = tokio::time::timeout(
                    self.read_timeout,
                    limited.read_until(b'\n', &mut line),
                ) => read,
            };

            match read {
                Err(_elapsed) => self.handle_timeout(&mut line, processor)?,
                Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => {
                    self.handle_timeout(&mut line, processor)?
                }
                Ok(Err(e)) => return Err(ReaderError::Read(e)),
                Ok(Ok(0)) => {
                    if !line.is_empty() {
                        Self::handle_line(&mut line, processor)?;
                    }
                    info!(device = %self.device, "serial_stream_closed");
                    return Ok(ReaderExit::EndOfStream);
                }
                Ok(Ok(_)) => {
                    if line.last() == Some(&b'\n') {
                        Self::handle_line(&mut line, processor)?;
                    } else if line.len() >= MAX_LINE_BYTES {
                        warn!(device = %self.device, bytes = line.len(), "serial_line_too_long");
                        Self::handle_line(&mut line, processor)?;
                    }
                }
            }

            if !self.poll_interval.is_zero() {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if should_stop(changed, &shutdown) {
                            info!("serial_reader_shutdown");
                            return Ok(ReaderExit::Shutdown);
                        }
                    }
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
    }

    fn handle_timeout(&self, line: &mut Vec<u8>, processor: &mut ScanProcessor) -> Result<(), ReaderError> {
        if line.is_empty() {
            return Ok(());
        }
        trace!(device = %self.device, pending_bytes = line.len(), "serial_read_timeout_flush");
        Self::handle_line(line, processor)
    }

    fn handle_line(line: &mut Vec<u8>, processor: &mut ScanProcessor) -> Result<(), ReaderError> {
        let text = String::from_utf8(std::mem::replace(line, Vec::with_capacity(LINE_CAPACITY)))?;
        debug!(raw = ?text.trim(), "serial_line_received");
        processor.process_line(&text)?;
        Ok(())
    }
}
