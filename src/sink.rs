//! Progress and diagnostic sinks consumed by the supervisor.

use tracing::{debug, info};

/// Receives user-facing progress updates.
pub trait ProgressSink: Send + Sync {
    /// Display `message` to the user.
    fn report(&self, message: &str);
}

/// Receives worker output that is not part of the structured protocol.
pub trait DiagnosticSink: Send + Sync {
    /// A stdout line that did not decode as a structured event.
    fn diagnostic(&self, line: &str);

    /// A line from the worker's stderr, verbatim.
    fn stderr(&self, line: &str);
}

/// Sink that routes everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn report(&self, message: &str) {
        info!(target: "worker_intercom::progress", "{message}");
    }
}

impl DiagnosticSink for LogSink {
    fn diagnostic(&self, line: &str) {
        debug!(target: "worker_intercom::worker", stream = "stdout", "{line}");
    }

    fn stderr(&self, line: &str) {
        debug!(target: "worker_intercom::worker", stream = "stderr", "{line}");
    }
}
