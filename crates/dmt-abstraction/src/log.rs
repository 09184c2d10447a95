//! Human-readable activity log.
//!
//! Activity lines are what a user sees ("Epoch 10 end with loss 3.2"); they
//! are separate from `tracing` diagnostics, although `TracingLogSink` routes
//! them there for the CLI.

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::info;

/// Receives activity lines.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Forwards activity lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, line: &str) {
        info!(target: "dmt::activity", "{}", line);
    }
}

/// Forwards activity lines to an unbounded channel.
///
/// Lines sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelLogSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelLogSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelLogSink {
    fn log(&self, line: &str) {
        let _ = self.tx.send(line.to_string());
    }
}

/// Collects activity lines in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
