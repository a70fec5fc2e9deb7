//! Event dispatcher.
//!
//! Routes decoded [`WorkerEvent`]s, strictly in arrival order, to the
//! progress sink, the diagnostic sink, or the interactive handler, and
//! enforces the termination rules: an `error` event fails the session, and
//! once the session is terminated every later event is ignored.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use crate::interaction::handler::InteractiveHandler;
use crate::protocol::event::WorkerEvent;
use crate::protocol::writer::ResponseWriter;
use crate::sink::{DiagnosticSink, ProgressSink};
use crate::supervisor::session::SessionState;

/// What the supervisor should do after one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing.
    Continue,
    /// The worker reported a failure; stop and kill it.
    Terminate(String),
    /// The session was already terminated; the event had no effect.
    Ignored,
}

/// Sequential event router for one session.
pub struct Dispatcher<W> {
    session: SessionState,
    progress: Arc<dyn ProgressSink>,
    diagnostics: Arc<dyn DiagnosticSink>,
    handler: InteractiveHandler,
    writer: ResponseWriter<W>,
}

impl<W> std::fmt::Debug for Dispatcher<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session", &self.session)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl<W> Dispatcher<W>
where
    W: AsyncWrite + Unpin,
{
    /// Build a dispatcher that owns `session` and the worker's stdin.
    pub fn new(
        session: SessionState,
        progress: Arc<dyn ProgressSink>,
        diagnostics: Arc<dyn DiagnosticSink>,
        handler: InteractiveHandler,
        stdin: W,
    ) -> Self {
        Self {
            session,
            progress,
            diagnostics,
            handler,
            writer: ResponseWriter::new(stdin),
        }
    }

    /// Session state, for inspection.
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Session state, for terminal transitions driven by process exit.
    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    /// Handle one event.
    ///
    /// An `input_request` suspends until the user has decided and the
    /// response has been written to the worker's stdin.
    pub async fn dispatch(&mut self, event: WorkerEvent) -> Flow {
        if self.session.is_terminated() {
            debug!(
                session_id = self.session.id.as_str(),
                kind = event.kind(),
                "dispatcher: session terminated, ignoring event"
            );
            return Flow::Ignored;
        }

        match event {
            WorkerEvent::Status { message, node } => {
                debug!(
                    session_id = self.session.id.as_str(),
                    node = node.as_deref().unwrap_or_default(),
                    "worker status"
                );
                self.progress.report(&message);
                Flow::Continue
            }

            WorkerEvent::Error { message } => {
                if self.session.fail() {
                    warn!(
                        session_id = self.session.id.as_str(),
                        error = message.as_str(),
                        "worker reported error"
                    );
                    Flow::Terminate(message)
                } else {
                    Flow::Ignored
                }
            }

            WorkerEvent::InputRequest(request) => {
                let response = self.handler.resolve(&request).await;
                if let Err(err) = self.writer.send(&response).await {
                    // Worker most likely exited; its exit status decides the outcome.
                    warn!(
                        session_id = self.session.id.as_str(),
                        key = request.key.as_str(),
                        %err,
                        "dispatcher: could not deliver input response"
                    );
                }
                Flow::Continue
            }

            WorkerEvent::Unrecognized { raw } => {
                self.diagnostics.diagnostic(&raw);
                Flow::Continue
            }
        }
    }
}
