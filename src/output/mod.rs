//! The single serialization point in front of the output sink.
//!
//! Every write, from the sequencing thread or from any worker a method body
//! leaked, is sent over one channel to a dedicated writer thread which owns
//! the sink. The channel order is the real-time order of the writes, so log
//! lines from concurrent sources interleave exactly as they happened while
//! section lines (`START`, `PASS`, `FAIL`, ...) stay ordered among themselves.
//!
//! The writer thread lives as long as any dispatcher handle does, so workers
//! that outlive their test, or the whole run, still get their lines written.

use std::{
    fmt::{self, Debug},
    io, thread,
};

use crossbeam_channel::Sender;

use crate::{outcome::MethodOutcome, suite::MethodMeta};

pub(crate) mod render;

/// How much the dispatcher writes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// Problems only, each with the buffered log of the failing method.
    #[default]
    Quiet,
    /// Like quiet, plus one line for every concluded test.
    Verbose,
    /// No buffering. Section lines and log lines are written as they happen.
    Stream,
}

impl OutputMode {
    pub fn is_stream(self) -> bool {
        self == OutputMode::Stream
    }
}

enum Command {
    Write(String),
    Flush(Sender<()>),
}

#[derive(Clone)]
pub struct OutputDispatcher {
    tx: Sender<Command>,
    mode: OutputMode,
}

impl Debug for OutputDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputDispatcher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl OutputDispatcher {
    /// Starts the writer thread that owns `sink`.
    pub fn spawn<W>(mut sink: W, mode: OutputMode) -> io::Result<Self>
    where
        W: io::Write + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded::<Command>();
        thread::Builder::new()
            .name("suitest-output".into())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        Command::Write(text) => {
                            let written = sink.write_all(text.as_bytes()).and_then(|_| sink.flush());
                            if let Err(err) = written {
                                tracing::warn!(%err, "cannot write to output sink");
                            }
                        }
                        Command::Flush(ack) => {
                            if let Err(err) = sink.flush() {
                                tracing::warn!(%err, "cannot flush output sink");
                            }
                            // The waiting side may have given up already.
                            let _ = ack.send(());
                        }
                    }
                }
            })?;

        Ok(Self { tx, mode })
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Queues raw text. Dropped silently once the writer thread is gone.
    pub fn write(&self, text: String) {
        let _ = self.tx.send(Command::Write(text));
    }

    pub fn log_line(&self, line: &str) {
        self.write(format!("{line}\n"));
    }

    pub fn call_started(&self, meta: &MethodMeta) {
        if self.mode.is_stream() {
            self.write(render::started(meta));
        }
    }

    pub fn call_finished(&self, meta: &MethodMeta, outcome: &MethodOutcome) {
        if let Some(text) = render::finished(meta, outcome, self.mode) {
            self.write(text);
        }
    }

    /// Blocks until everything queued before this call reached the sink.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}
