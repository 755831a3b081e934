//! Lifecycle tracing sink for the room hub.
//!
//! The hub reports joins, departures, and fan-out progress to a [`Tracer`].
//! [`TracerOff`] is always a valid choice; nothing in the hub depends on
//! what a tracer does with the events.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;

use tokio::sync::mpsc;

use crate::error::ChatError;

/// Events buffered ahead of a [`QueuedTracer`]'s writer thread.
pub const DEFAULT_TRACE_QUEUE: usize = 1024;

/// An object capable of recording free-form events.
pub trait Tracer: Send + Sync + fmt::Debug {
    /// Records one event.
    fn trace(&self, event: &str);
}

/// Tracer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracerOff;

impl Tracer for TracerOff {
    fn trace(&self, _event: &str) {}
}

/// Tracer that forwards events to the `tracing` subscriber at `INFO`,
/// under the `chat_room::trace` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace(&self, event: &str) {
        tracing::info!(target: "chat_room::trace", "{event}");
    }
}

/// Tracer that writes one line per event to an [`io::Write`](std::io::Write).
pub struct WriterTracer<W> {
    out: Mutex<W>,
}

impl<W: Write> WriterTracer<W> {
    /// Creates a tracer writing to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the tracer and returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W> fmt::Debug for WriterTracer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterTracer").finish_non_exhaustive()
    }
}

impl<W: Write + Send> Tracer for WriterTracer<W> {
    fn trace(&self, event: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Tracing must never take the hub down.
        let _ = writeln!(out, "{event}");
    }
}

/// Tracer that hands events to a dedicated writer thread.
///
/// `trace` never blocks: when the queue is full the event is dropped, so a
/// stalled writer cannot hold up the room loop. The thread exits once the
/// tracer is dropped and the queue is drained.
#[derive(Debug)]
pub struct QueuedTracer {
    events: mpsc::Sender<String>,
}

impl QueuedTracer {
    /// Starts a writer thread over `out` with room for `capacity` pending
    /// events.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidConfig`] if the thread cannot be spawned.
    pub fn spawn<W>(out: W, capacity: usize) -> Result<Self, ChatError>
    where
        W: Write + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let sink = WriterTracer::new(out);
        thread::Builder::new()
            .name("chat-trace".to_string())
            .spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    sink.trace(&event);
                }
            })
            .map_err(|e| ChatError::InvalidConfig(format!("trace writer: {e}")))?;
        Ok(Self { events: tx })
    }
}

impl Tracer for QueuedTracer {
    fn trace(&self, event: &str) {
        let _ = self.events.try_send(event.to_string());
    }
}

/// Where tracer events go, as selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceOutput {
    /// Discard events.
    #[default]
    Off,
    /// Forward events to the log at `INFO`.
    Log,
    /// Write events to standard output from a background thread; events
    /// are dropped while stdout is backed up.
    Stdout,
}

impl TraceOutput {
    /// Builds the tracer for this output.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidConfig`] if the stdout writer thread
    /// cannot be started.
    pub fn build(self) -> Result<Arc<dyn Tracer>, ChatError> {
        Ok(match self {
            Self::Off => Arc::new(TracerOff),
            Self::Log => Arc::new(LogTracer),
            Self::Stdout => Arc::new(QueuedTracer::spawn(
                std::io::stdout(),
                DEFAULT_TRACE_QUEUE,
            )?),
        })
    }
}

impl FromStr for TraceOutput {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "none" => Ok(Self::Off),
            "log" => Ok(Self::Log),
            "stdout" => Ok(Self::Stdout),
            other => Err(ChatError::InvalidConfig(format!(
                "unknown trace output: {other}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn writer_tracer_writes_one_line_per_event() {
        let tracer = WriterTracer::new(Vec::new());
        tracer.trace("Hello trace package.");
        tracer.trace("client joined");
        let out = tracer.into_inner();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "Hello trace package.\nclient joined\n"
        );
    }

    #[test]
    fn tracer_off_accepts_events() {
        let Ok(tracer) = TraceOutput::Off.build() else {
            panic!("off tracer should build");
        };
        tracer.trace("something");
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            match self.0.lock() {
                Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
                Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
            }
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut buf) = self.0.lock() {
                buf.extend_from_slice(data);
            }
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn queued_tracer_writes_in_order_off_thread() {
        let buf = SharedBuf::default();
        let Ok(tracer) = QueuedTracer::spawn(buf.clone(), 16) else {
            panic!("writer thread should start");
        };
        tracer.trace("client joined");
        tracer.trace("client left");
        drop(tracer);

        for _ in 0..200 {
            if buf.contents().lines().count() == 2 {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(buf.contents(), "client joined\nclient left\n");
    }

    /// A writer that never returns until released.
    struct Stalled(std::sync::mpsc::Receiver<()>);

    impl Write for Stalled {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn queued_tracer_never_blocks_on_a_stalled_writer() {
        let (release, stalled) = std::sync::mpsc::channel();
        let Ok(tracer) = QueuedTracer::spawn(Stalled(stalled), 2) else {
            panic!("writer thread should start");
        };
        for n in 0..100 {
            tracer.trace(&format!("event {n}"));
        }
        drop(release);
    }

    #[test]
    fn parses_trace_outputs() {
        assert_eq!("off".parse::<TraceOutput>().ok(), Some(TraceOutput::Off));
        assert_eq!("LOG".parse::<TraceOutput>().ok(), Some(TraceOutput::Log));
        assert_eq!(
            "stdout".parse::<TraceOutput>().ok(),
            Some(TraceOutput::Stdout)
        );
        assert!("syslog".parse::<TraceOutput>().is_err());
    }
}
