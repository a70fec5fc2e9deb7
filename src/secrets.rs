//! Secret store collaborator and credential resolution.
//!
//! The worker usually needs an API credential in its environment. The
//! credential is resolved once before spawn, in this order:
//! 1. the [`SecretStore`] (OS keychain in the binary);
//! 2. an environment variable of the same name;
//! 3. an optional interactive prompt, whose answer is persisted back into
//!    the store so the next run does not ask again.

use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::pin::Pin;

use inquire::{Password, PasswordDisplayMode};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{AppError, Result};

/// Boxed future returned by the collaborator traits in this module.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Named secret storage.
pub trait SecretStore: Send + Sync {
    /// Fetch the secret stored under `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Secret`] if the backing store cannot be queried.
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Store `value` under `name`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Secret`] if the backing store rejects the write.
    fn set<'a>(&'a self, name: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Asks the user for a missing credential.
pub trait CredentialPrompt: Send + Sync {
    /// Ask for `name`; `None` when the user declines.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Secret`] if the prompt cannot be shown.
    fn ask<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

// ── Keyring ──────────────────────────────────────────────────────────────────

/// OS keychain store, one entry per secret name under a fixed service.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Store using keychain service `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl SecretStore for KeyringStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let service = self.service.clone();
        let key = name.to_owned();
        Box::pin(async move {
            // keyring is synchronous I/O.
            let lookup = tokio::task::spawn_blocking(move || {
                keyring::Entry::new(&service, &key).and_then(|entry| entry.get_password())
            })
            .await
            .map_err(|err| AppError::Secret(format!("keychain task panicked: {err}")))?;

            match lookup {
                Ok(value) if !value.is_empty() => Ok(Some(value)),
                Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
                Err(err) => Err(AppError::Secret(format!("keychain lookup failed: {err}"))),
            }
        })
    }

    fn set<'a>(&'a self, name: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        let service = self.service.clone();
        let key = name.to_owned();
        let value = value.to_owned();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                keyring::Entry::new(&service, &key).and_then(|entry| entry.set_password(&value))
            })
            .await
            .map_err(|err| AppError::Secret(format!("keychain task panicked: {err}")))?
            .map_err(|err| AppError::Secret(format!("keychain write failed: {err}")))
        })
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Process-local store, for tests and for runs without a keychain.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move { Ok(self.entries.lock().await.get(name).cloned()) })
    }

    fn set<'a>(&'a self, name: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.entries
                .lock()
                .await
                .insert(name.to_owned(), value.to_owned());
            Ok(())
        })
    }
}

// ── Terminal prompt ──────────────────────────────────────────────────────────

/// Masked password prompt on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn ask<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let message = format!("{name} is required (stored securely):");
        Box::pin(async move {
            let answer = tokio::task::spawn_blocking(move || {
                Password::new(&message)
                    .without_confirmation()
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .prompt()
            })
            .await
            .map_err(|err| AppError::Secret(format!("prompt task panicked: {err}")))?;

            match answer {
                Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_owned())),
                Ok(_)
                | Err(
                    inquire::InquireError::OperationCanceled
                    | inquire::InquireError::OperationInterrupted,
                ) => Ok(None),
                Err(err) => Err(AppError::Secret(format!("credential prompt failed: {err}"))),
            }
        })
    }
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Resolve credential `name` from the store, the environment, or the user.
///
/// Store failures are logged and treated as a miss. A value obtained from
/// `prompt` is written back into `store`; a failed write is logged but the
/// value is still returned.
///
/// # Errors
///
/// Returns [`AppError::Secret`] only if the prompt itself fails.
pub async fn resolve_credential(
    store: &dyn SecretStore,
    name: &str,
    prompt: Option<&dyn CredentialPrompt>,
) -> Result<Option<String>> {
    match store.get(name).await {
        Ok(Some(value)) => return Ok(Some(value)),
        Ok(None) => {}
        Err(err) => warn!(key = name, %err, "secret store lookup failed, trying env var"),
    }

    if let Ok(value) = env::var(name) {
        if !value.is_empty() {
            return Ok(Some(value));
        }
    }

    let Some(prompt) = prompt else {
        return Ok(None);
    };

    let Some(value) = prompt.ask(name).await? else {
        return Ok(None);
    };

    match store.set(name, &value).await {
        Ok(()) => info!(key = name, "credential saved to secret store"),
        Err(err) => warn!(key = name, %err, "could not persist credential"),
    }
    Ok(Some(value))
}
