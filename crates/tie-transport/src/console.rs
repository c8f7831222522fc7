//! ---
//! tie_section: "04-networking-delivery"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Delivery channels and outcome reporting."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tie_msg::to_display;
use tracing::warn;

use crate::DeliveryOutcome;

/// Shared line-oriented console writer.
///
/// Printed messages and the feed's `[INFO]`/`[ERROR]` lines go through the same sink
/// so they interleave in delivery order.
#[derive(Clone)]
pub struct ConsoleSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleSink {
    /// Sink writing to the process stdout.
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Sink writing to an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Sink backed by memory, with a handle for reading back what was written.
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::from_writer(captured.clone()), captured)
    }

    /// Write `line` followed by a newline and flush.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Like [`ConsoleSink::write_line`] but only logs a failed write.
    pub fn emit(&self, line: &str) {
        if let Err(err) = self.write_line(line) {
            warn!(error = %err, "console write failed");
        }
    }
}

/// In-memory console contents, cloned out of [`ConsoleSink::capture`].
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written lines that start with `prefix`.
    pub fn lines_starting_with(&self, prefix: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.starts_with(prefix))
            .map(str::to_owned)
            .collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Prints each message with one segment per line. Never fails.
#[derive(Clone)]
pub struct ConsoleChannel {
    sink: ConsoleSink,
}

impl ConsoleChannel {
    /// Channel printing into `sink`.
    pub fn new(sink: ConsoleSink) -> Self {
        Self { sink }
    }

    /// Print `message` in its display form.
    pub fn deliver(&self, message: &str) -> DeliveryOutcome {
        self.sink.emit(&to_display(message));
        DeliveryOutcome::Printed
    }
}
