//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all supervision failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Secret store lookup or persistence failure.
    Secret(String),
    /// Project root could not be located.
    Discovery(String),
    /// Worker could not be started (missing entry point, OS spawn failure).
    Spawn(String),
    /// Wire protocol failure on the worker's standard streams.
    Protocol(String),
    /// Worker reported an unrecoverable failure through an `error` event.
    Worker(String),
    /// Worker exited with a nonzero code or was killed by a signal.
    AbnormalExit(Option<i32>),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Secret(msg) => write!(f, "secret: {msg}"),
            Self::Discovery(msg) => write!(f, "discovery: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Worker(msg) => write!(f, "{msg}"),
            // The diagnostic stream carries the detail; keep this generic.
            Self::AbnormalExit(_) => write!(f, "worker process failed"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
