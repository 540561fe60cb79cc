//! Line-oriented output capabilities for target functions.
//!
//! The pool never serializes calls to its function, so output that several
//! workers share has to be made interleave-safe by the caller. Capture a
//! sink in the function instead of writing to a stream directly.

use crossbeam::channel::{self, Receiver, Sender};
use std::io::{self, Stdout, Write};
use std::sync::{Mutex, PoisonError};

pub trait Sink: Send + Sync {
    /// Emits one complete line; concurrent lines never interleave.
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Serializes whole lines onto any writer.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl WriterSink<Stdout> {
    pub fn stdout() -> Self {
        WriterSink::new(io::stdout())
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

/// Forwards lines to a channel, for callers that collect output elsewhere.
#[derive(Clone)]
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, Receiver<String>) {
        let (tx, rx) = channel::unbounded();
        (ChannelSink { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.tx
            .send(line.to_owned())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "sink receiver dropped"))
    }
}
