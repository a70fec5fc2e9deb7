//! Per-invocation session state and the single-completion guard.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

/// Lifecycle of one supervised worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Worker not spawned yet.
    NotStarted,
    /// Worker spawned and attached.
    Running,
    /// Worker exited with code 0 and reported no error.
    Completed,
    /// Spawn failure, worker error event, or abnormal exit.
    Failed,
}

impl SessionStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State owned by the supervisor for the lifetime of one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Log correlation identifier.
    pub id: String,
    /// Directory the worker runs in.
    pub working_dir: PathBuf,
    /// Variables layered over the inherited environment at spawn.
    pub env_overrides: HashMap<String, String>,
    status: SessionStatus,
    terminated: bool,
}

impl SessionState {
    /// Fresh session in [`SessionStatus::NotStarted`].
    #[must_use]
    pub fn new(working_dir: PathBuf, env_overrides: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            working_dir,
            env_overrides,
            status: SessionStatus::NotStarted,
            terminated: false,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether a terminal transition has already happened.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// `NotStarted → Running`. Returns `false` from any other state.
    pub fn mark_running(&mut self) -> bool {
        if self.status != SessionStatus::NotStarted {
            return false;
        }
        self.status = SessionStatus::Running;
        true
    }

    /// Enter [`SessionStatus::Completed`]. Returns `true` only for the call
    /// that performed the transition.
    pub fn complete(&mut self) -> bool {
        self.terminate(SessionStatus::Completed)
    }

    /// Enter [`SessionStatus::Failed`]. Returns `true` only for the call that
    /// performed the transition.
    pub fn fail(&mut self) -> bool {
        self.terminate(SessionStatus::Failed)
    }

    fn terminate(&mut self, status: SessionStatus) -> bool {
        if self.terminated {
            debug!(session_id = self.id.as_str(), ?status, "session already terminated, ignoring");
            return false;
        }
        self.terminated = true;
        self.status = status;
        true
    }
}
