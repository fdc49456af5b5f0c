//! Directional sensor angle reading.
//!
//! The sensor emits one `-?[0-9]+\r\n` line per measurement. The capture and
//! sensor streams are aligned by the caller: one sensor line is consumed per
//! capture line. Anything that is not a well-formed angle line, including a
//! timeout or end of stream, reads as "no angle".

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

static ANGLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?[0-9]+)\r\n").expect("angle line pattern is valid"));

/// Parse a raw sensor line, terminator included.
pub fn parse_angle_line(line: &str) -> Option<i32> {
    let captures = ANGLE_LINE.captures(line)?;
    captures.get(1)?.as_str().parse().ok()
}

/// A blocking source of raw sensor lines.
pub trait SensorLineSource: Send {
    /// Next line including its terminator, or `None` on timeout, end of
    /// stream or read failure.
    fn next_line(&mut self) -> Option<String>;
}

/// Reads lines straight from a buffered reader.
pub struct BufReadSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead + Send> BufReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead + Send> SensorLineSource for BufReadSource<R> {
    fn next_line(&mut self) -> Option<String> {
        read_raw_line(&mut self.reader, &mut self.buf)
    }
}

/// Reads lines on a background thread so each read can time out.
///
/// A line that shows up after its read timed out belongs to a capture line
/// that was already handled. After a timeout, every line received before the
/// next read starts is discarded so the sensor does not stay one line behind.
///
/// The thread exits once the reader hits end of stream or this source is dropped.
pub struct ThreadedLineSource {
    lines: Receiver<(Instant, String)>,
    timeout: Duration,
    timed_out: bool,
}

impl ThreadedLineSource {
    /// Start reading `reader` on a thread named `angle-sensor`.
    pub fn spawn<R>(reader: R, timeout: Duration) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("angle-sensor".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(reader);
                let mut buf = Vec::new();
                while let Some(line) = read_raw_line(&mut reader, &mut buf) {
                    if tx.send((Instant::now(), line)).is_err() {
                        break;
                    }
                }
                debug!(category = "sensor", "Sensor stream ended");
            })?;

        Ok(Self {
            lines: rx,
            timeout,
            timed_out: false,
        })
    }

    /// Discard lines that arrived before `requested`.
    fn drain_late_lines(&mut self, requested: Instant) -> Option<String> {
        while let Ok((received, line)) = self.lines.try_recv() {
            if received >= requested {
                return Some(line);
            }
            debug!(category = "sensor", line = ?line, "Dropping late sensor line");
        }
        None
    }
}

impl SensorLineSource for ThreadedLineSource {
    fn next_line(&mut self) -> Option<String> {
        let requested = Instant::now();
        if std::mem::take(&mut self.timed_out) {
            if let Some(line) = self.drain_late_lines(requested) {
                return Some(line);
            }
        }

        match self.lines.recv_timeout(self.timeout) {
            Ok((_, line)) => Some(line),
            Err(RecvTimeoutError::Timeout) => {
                trace!(category = "sensor", "Sensor read timed out");
                self.timed_out = true;
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn read_raw_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String> {
    buf.clear();
    match reader.read_until(b'\n', buf) {
        Ok(0) => None,
        Ok(_) => Some(String::from_utf8_lossy(buf).into_owned()),
        Err(e) => {
            debug!(category = "sensor", "Sensor read failed: {}", e);
            None
        }
    }
}

/// Turns sensor lines into angles. Without a source every read is `None`.
#[derive(Default)]
pub struct SensorReader {
    source: Option<Box<dyn SensorLineSource>>,
}

impl SensorReader {
    /// A reader for angle-free operation.
    pub fn disabled() -> Self {
        Self { source: None }
    }

    pub fn new(source: impl SensorLineSource + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
        }
    }

    /// Read synchronously from a buffered reader.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self::new(BufReadSource::new(reader))
    }

    /// Read from a blocking reader, waiting at most `timeout` per line.
    pub fn spawn<R: Read + Send + 'static>(reader: R, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self::new(ThreadedLineSource::spawn(reader, timeout)?))
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Consume one sensor line and return its angle, if it holds one.
    pub fn read_angle(&mut self) -> Option<i32> {
        let line = self.source.as_mut()?.next_line()?;
        let angle = parse_angle_line(&line);
        if angle.is_none() {
            trace!(category = "sensor", line = ?line, "Ignoring sensor line");
        }
        angle
    }
}

impl std::fmt::Debug for SensorReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorReader")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
