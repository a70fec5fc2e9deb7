//! Global configuration parsing and validation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::discovery::DEFAULT_ROOT_MARKER;
use crate::supervisor::spawner::WorkerSpec;
use crate::{AppError, Result};

/// How to launch the worker process.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Executable (e.g. `python3`, or `python/venv/bin/python`).
    pub program: PathBuf,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// File that must exist before spawning; usually the worker script.
    #[serde(default)]
    pub entry_point: Option<PathBuf>,
    /// Extra environment variables for the worker.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Credential injected into the worker's environment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CredentialConfig {
    /// Secret name; also the environment variable the worker reads.
    pub name: String,
    /// OS keychain service the secret is stored under.
    #[serde(default = "default_service")]
    pub service: String,
    /// Ask on the terminal when the secret is missing.
    #[serde(default = "default_true")]
    pub prompt: bool,
    /// Refuse to start the worker without the secret.
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Interactive exchange settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InteractionConfig {
    /// Seconds to wait for a user decision; 0 means no timeout.
    #[serde(default)]
    pub timeout_seconds: u64,
}

/// Project root discovery settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DiscoveryConfig {
    /// Names whose presence marks a directory as the project root.
    #[serde(default = "default_root_markers")]
    pub root_markers: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root_markers: default_root_markers(),
        }
    }
}

fn default_service() -> String {
    "worker-intercom".into()
}

fn default_true() -> bool {
    true
}

fn default_root_markers() -> Vec<String> {
    vec![DEFAULT_ROOT_MARKER.to_owned()]
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Worker launch settings.
    pub worker: WorkerConfig,
    /// Optional credential injection.
    #[serde(default)]
    pub credential: Option<CredentialConfig>,
    /// Interactive exchange settings.
    #[serde(default)]
    pub interaction: InteractionConfig,
    /// Project root discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// Relative `program` and `entry_point` paths containing a directory
    /// component resolve against the config file's directory; bare program
    /// names are left for `PATH` lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        let mut config = Self::from_toml_str(&raw)?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Worker launch description.
    #[must_use]
    pub fn worker_spec(&self) -> WorkerSpec {
        WorkerSpec {
            program: self.worker.program.clone(),
            args: self.worker.args.clone(),
            entry_point: self.worker.entry_point.clone(),
        }
    }

    /// Interaction timeout, `None` when disabled.
    #[must_use]
    pub fn interaction_timeout(&self) -> Option<Duration> {
        (self.interaction.timeout_seconds > 0)
            .then(|| Duration::from_secs(self.interaction.timeout_seconds))
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let program = &self.worker.program;
        if program.is_relative() && program.components().count() > 1 {
            self.worker.program = base.join(program);
        }
        if let Some(entry) = &self.worker.entry_point {
            if entry.is_relative() {
                self.worker.entry_point = Some(base.join(entry));
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.worker.program.as_os_str().is_empty() {
            return Err(AppError::Config("worker.program must not be empty".into()));
        }

        if self.discovery.root_markers.is_empty() {
            return Err(AppError::Config(
                "discovery.root_markers must not be empty".into(),
            ));
        }

        if let Some(credential) = &self.credential {
            if credential.name.trim().is_empty() {
                return Err(AppError::Config("credential.name must not be empty".into()));
            }
        }

        Ok(())
    }
}
