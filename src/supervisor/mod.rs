//! Worker process supervision.
//!
//! A [`Supervisor`] owns one session from spawn to terminal state:
//!
//! ```text
//! spawn_worker ─► stdout ─► LineFramer ─► (unbounded mpsc) ─► decode_line ─► Dispatcher
//!              ├► stderr ─► DiagnosticSink::stderr                               │
//!              └► stdin  ◄─────────────── ResponseWriter ◄── InteractiveHandler ◄┘
//! ```
//!
//! The stdout reader keeps accepting output while an interactive exchange is
//! outstanding; dispatch of those lines waits until the response has been
//! written. The session completes only after stdout has closed and the
//! process has exited, so trailing output is always processed first. An
//! `error` event ends the session immediately and kills the worker.
//!
//! Submodules:
//! - `session`: [`SessionState`](session::SessionState) and its terminal guard.
//! - `dispatcher`: sequential event routing.
//! - `spawner`: process creation with environment layering.

pub mod dispatcher;
pub mod session;
pub mod spawner;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::interaction::handler::InteractiveHandler;
use crate::protocol::codec::{LineFramer, WorkerCodec, MAX_EVENT_BYTES};
use crate::protocol::event::{decode_line, WorkerEvent};
use crate::sink::{DiagnosticSink, LogSink, ProgressSink};
use crate::{AppError, Result};

use self::dispatcher::{Dispatcher, Flow};
use self::session::SessionState;
use self::spawner::{spawn_worker, WorkerProcess, WorkerSpec};

/// Size of each read from the worker's stdout.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long to wait for trailing stderr after the worker has exited.
const STDERR_DRAIN: Duration = Duration::from_secs(2);

/// Progress message reported when a session completes.
pub const FINISHED_MESSAGE: &str = "✅ Worker finished";

/// Output of the stdout reader task, in stream order.
#[derive(Debug)]
enum StdoutItem {
    /// A complete, non-blank record.
    Line(String),
    /// Unterminated text left at end of stream; never decoded.
    Residue(String),
    /// A record exceeded the event size limit; terminal for the session.
    Oversized(AppError),
}

/// Supervises one worker session.
pub struct Supervisor {
    spec: WorkerSpec,
    working_dir: PathBuf,
    env: HashMap<String, String>,
    max_event_bytes: usize,
    handler: InteractiveHandler,
    progress: Arc<dyn ProgressSink>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("spec", &self.spec)
            .field("working_dir", &self.working_dir)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Supervisor for `spec` running in `working_dir`, logging progress and
    /// diagnostics through [`LogSink`] until other sinks are supplied.
    #[must_use]
    pub fn new(spec: WorkerSpec, working_dir: impl Into<PathBuf>, handler: InteractiveHandler) -> Self {
        Self {
            spec,
            working_dir: working_dir.into(),
            env: HashMap::new(),
            max_event_bytes: MAX_EVENT_BYTES,
            handler,
            progress: Arc::new(LogSink),
            diagnostics: Arc::new(LogSink),
        }
    }

    /// Layer `key=value` over the inherited environment.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Layer several variables over the inherited environment.
    #[must_use]
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Inject a credential as `env_name` when one is available.
    #[must_use]
    pub fn with_credential(self, env_name: &str, credential: Option<String>) -> Self {
        match credential {
            Some(value) => self.with_env(env_name, value),
            None => self,
        }
    }

    /// Fail the session on any stdout record longer than `limit` bytes.
    #[must_use]
    pub fn with_max_event_bytes(mut self, limit: usize) -> Self {
        self.max_event_bytes = limit;
        self
    }

    /// Route `status` events to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Route unrecognised stdout lines and stderr to `sink`.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Run the session to completion.
    ///
    /// # Errors
    ///
    /// Exactly one of:
    /// - [`AppError::Spawn`]: the worker never started.
    /// - [`AppError::Worker`]: the worker sent an `error` event; carries its message.
    /// - [`AppError::Protocol`]: a stdout record exceeded the event size limit.
    /// - [`AppError::AbnormalExit`]: nonzero exit code or death by signal.
    pub async fn run(self) -> Result<()> {
        let session = SessionState::new(self.working_dir.clone(), self.env.clone());
        let span = info_span!("session", session_id = session.id.as_str());
        self.run_session(session).instrument(span).await
    }

    async fn run_session(self, mut session: SessionState) -> Result<()> {
        let Self {
            spec,
            max_event_bytes,
            handler,
            progress,
            diagnostics,
            ..
        } = self;

        let worker = match spawn_worker(&spec, &session) {
            Ok(worker) => worker,
            Err(err) => {
                session.fail();
                error!(%err, "worker failed to start");
                return Err(err);
            }
        };
        session.mark_running();

        let WorkerProcess {
            mut child,
            stdin,
            stdout,
            stderr,
        } = worker;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let stdout_task =
            tokio::spawn(read_stdout(stdout, max_event_bytes, line_tx).in_current_span());
        let mut stderr_task =
            tokio::spawn(forward_stderr(stderr, Arc::clone(&diagnostics)).in_current_span());

        let mut dispatcher = Dispatcher::new(
            session,
            Arc::clone(&progress),
            Arc::clone(&diagnostics),
            handler,
            stdin,
        );

        let mut stdout_open = true;
        let mut exit: Option<Option<i32>> = None;

        while stdout_open || exit.is_none() {
            tokio::select! {
                item = line_rx.recv(), if stdout_open => {
                    let line = match item {
                        None => {
                            debug!("worker stdout closed");
                            stdout_open = false;
                            continue;
                        }
                        Some(StdoutItem::Residue(raw)) => {
                            diagnostics.diagnostic(&raw);
                            continue;
                        }
                        Some(StdoutItem::Oversized(err)) => {
                            dispatcher.session_mut().fail();
                            error!(%err, "worker emitted an oversized event, terminating");
                            terminate(&mut child);
                            stdout_task.abort();
                            stderr_task.abort();
                            return Err(err);
                        }
                        Some(StdoutItem::Line(line)) => line,
                    };

                    let event = decode_line(&line);
                    let flow = if exit.is_some() {
                        if let WorkerEvent::InputRequest(request) = &event {
                            warn!(
                                key = request.key.as_str(),
                                "worker exited before input request could be answered"
                            );
                            Flow::Continue
                        } else {
                            dispatcher.dispatch(event).await
                        }
                    } else {
                        tokio::select! {
                            flow = dispatcher.dispatch(event) => flow,
                            status = child.wait() => {
                                warn!("worker exited while an interactive exchange was outstanding");
                                exit = Some(exit_code(status));
                                Flow::Continue
                            }
                        }
                    };

                    if let Flow::Terminate(message) = flow {
                        terminate(&mut child);
                        stdout_task.abort();
                        stderr_task.abort();
                        return Err(AppError::Worker(message));
                    }
                }

                status = child.wait(), if exit.is_none() => {
                    exit = Some(exit_code(status));
                }
            }
        }

        if tokio::time::timeout(STDERR_DRAIN, &mut stderr_task).await.is_err() {
            // A grandchild may still hold the pipe open.
            debug!("worker stderr still open after exit, stopping forwarder");
            stderr_task.abort();
        }

        let session = dispatcher.session_mut();
        let code = exit.flatten();
        if code == Some(0) && session.complete() {
            info!("worker completed");
            progress.report(FINISHED_MESSAGE);
            return Ok(());
        }

        session.fail();
        warn!(exit_code = ?code, "worker exited abnormally");
        Err(AppError::AbnormalExit(code))
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Read raw chunks from stdout, reassemble records, and forward them.
async fn read_stdout<R>(
    mut stdout: R,
    max_event_bytes: usize,
    line_tx: mpsc::UnboundedSender<StdoutItem>,
) where
    R: AsyncRead + Unpin,
{
    let mut framer = LineFramer::with_max_length(max_event_bytes);
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];

    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                framer.push(&chunk[..n]);
                loop {
                    let item = match framer.next_line() {
                        Ok(Some(line)) => StdoutItem::Line(line),
                        Ok(None) => break,
                        Err(err) => {
                            // Receiver may already be gone; the stream is over either way.
                            let _ = line_tx.send(StdoutItem::Oversized(err));
                            return;
                        }
                    };
                    if line_tx.send(item).is_err() {
                        debug!("stdout reader: receiver dropped, stopping");
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(%err, "stdout reader: read failed, stopping");
                break;
            }
        }
    }

    let last = match framer.finish() {
        Ok(Some(residue)) => StdoutItem::Residue(residue),
        Ok(None) => return,
        Err(err) => StdoutItem::Oversized(err),
    };
    let _ = line_tx.send(last);
}

/// Forward stderr lines verbatim to the diagnostic sink.
async fn forward_stderr<R>(stderr: R, diagnostics: Arc<dyn DiagnosticSink>)
where
    R: AsyncRead + Unpin,
{
    let mut framed = FramedRead::new(stderr, WorkerCodec::new());
    let mut skipped = false;
    loop {
        match framed.next().await {
            Some(Ok(line)) => {
                skipped = false;
                diagnostics.stderr(&line);
            }
            Some(Err(AppError::Protocol(msg))) => {
                warn!(error = msg.as_str(), "stderr reader: framing error, skipping");
                skipped = true;
            }
            Some(Err(err)) => {
                warn!(%err, "stderr reader: read failed, stopping");
                break;
            }
            // FramedRead yields one `None` after a decode error, then resumes.
            None if skipped => skipped = false,
            None => break,
        }
    }
}

/// Kill the worker without waiting for it to exit.
fn terminate(child: &mut Child) {
    match child.start_kill() {
        Ok(()) => info!(pid = ?child.id(), "worker terminated"),
        Err(err) => debug!(%err, "worker already gone"),
    }
}

fn exit_code(status: std::io::Result<ExitStatus>) -> Option<i32> {
    match status {
        Ok(status) => {
            debug!(%status, "worker exited");
            status.code()
        }
        Err(err) => {
            warn!(%err, "error waiting for worker process");
            None
        }
    }
}
