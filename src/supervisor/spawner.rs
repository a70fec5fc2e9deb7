//! Worker process spawner.
//!
//! Spawns the worker with:
//! - the session's working directory;
//! - the supervisor's own environment, with session overrides (such as an
//!   injected credential) layered on top;
//! - all three stdio streams piped;
//! - `kill_on_drop(true)` so an abandoned session never leaks a process.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::info;

use crate::supervisor::session::SessionState;
use crate::{AppError, Result};

// ── Configuration ────────────────────────────────────────────────────────────

/// How to launch the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Executable to run (e.g. `python3`, or a path to a venv interpreter).
    pub program: PathBuf,
    /// Arguments passed to `program`.
    pub args: Vec<String>,
    /// File that must exist before spawning (e.g. the worker's script).
    pub entry_point: Option<PathBuf>,
}

impl WorkerSpec {
    /// Spec running `program` with no arguments and no entry-point check.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            entry_point: None,
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Require `path` to exist before spawning.
    #[must_use]
    pub fn entry_point(mut self, path: impl Into<PathBuf>) -> Self {
        self.entry_point = Some(path.into());
        self
    }
}

// ── Process handle ───────────────────────────────────────────────────────────

/// A running worker with its stdio detached from the [`Child`].
#[derive(Debug)]
pub struct WorkerProcess {
    /// Child handle; dropping it kills the worker.
    pub child: Child,
    /// Write side for input responses.
    pub stdin: ChildStdin,
    /// Structured event stream.
    pub stdout: ChildStdout,
    /// Free-form diagnostic stream.
    pub stderr: ChildStderr,
}

// ── Spawner ──────────────────────────────────────────────────────────────────

/// Spawn the worker described by `spec` for `session`.
///
/// # Errors
///
/// - `AppError::Spawn("worker entry point not found: …")`: checked before
///   any process is started.
/// - `AppError::Spawn("failed to spawn worker: …")`: OS spawn failure
///   (executable missing, permission denied, bad working directory).
/// - `AppError::Spawn("failed to capture worker …")`: a stdio pipe was not
///   created.
pub fn spawn_worker(spec: &WorkerSpec, session: &SessionState) -> Result<WorkerProcess> {
    if let Some(entry) = &spec.entry_point {
        if !entry.exists() {
            return Err(AppError::Spawn(format!(
                "worker entry point not found: {}",
                entry.display()
            )));
        }
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&session.env_overrides)
        .current_dir(&session.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|err| {
        AppError::Spawn(format!(
            "failed to spawn worker `{}`: {err}",
            spec.program.display()
        ))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture worker stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture worker stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture worker stderr".into()))?;

    info!(
        session_id = session.id.as_str(),
        pid = ?child.id(),
        program = %spec.program.display(),
        cwd = %session.working_dir.display(),
        "worker spawned"
    );

    Ok(WorkerProcess {
        child,
        stdin,
        stdout,
        stderr,
    })
}
