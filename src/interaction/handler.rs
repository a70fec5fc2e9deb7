//! Interactive request handler.
//!
//! Turns a worker [`InputRequest`] into a [`ChoicePresentation`], hands it to
//! the injected [`ChoiceUi`], and suspends until the user decides. The UI
//! receives a [`ChoiceReply`] that wraps a `oneshot` sender: `accept` and
//! `dismiss` both consume it, so an exchange can be resolved at most once no
//! matter how many dismissal paths the UI has. A reply dropped without
//! either call resolves the exchange as dismissed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::interaction::presentation::ChoicePresentation;
use crate::protocol::event::{InputRequest, InputResponse};

/// Terminal user action on a presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// User accepted with the given item indices selected.
    Accepted(Vec<usize>),
    /// Presentation was closed without an explicit acceptance.
    Dismissed,
}

/// One-shot completion handle for a single exchange.
#[derive(Debug)]
pub struct ChoiceReply {
    tx: oneshot::Sender<ChoiceOutcome>,
}

impl ChoiceReply {
    /// Create a reply handle and the receiver the handler awaits.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<ChoiceOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Resolve with the indices of the selected items.
    pub fn accept(self, chosen: Vec<usize>) {
        self.resolve(ChoiceOutcome::Accepted(chosen));
    }

    /// Resolve without a decision.
    pub fn dismiss(self) {
        self.resolve(ChoiceOutcome::Dismissed);
    }

    /// Whether the handler stopped waiting (worker exited or timeout).
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    fn resolve(self, outcome: ChoiceOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!("choice reply: handler no longer waiting, outcome dropped");
        }
    }
}

/// UI collaborator that presents choices to the user.
///
/// Implementations must not block the caller: show the presentation and
/// resolve `reply` later, from whatever context the UI runs on.
pub trait ChoiceUi: Send + Sync {
    /// Present `presentation` and eventually resolve `reply`.
    fn show(&self, presentation: ChoicePresentation, reply: ChoiceReply);
}

/// Resolves worker input requests through a [`ChoiceUi`].
#[derive(Clone)]
pub struct InteractiveHandler {
    ui: Arc<dyn ChoiceUi>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for InteractiveHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveHandler")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InteractiveHandler {
    /// Handler that waits indefinitely for the user.
    #[must_use]
    pub fn new(ui: Arc<dyn ChoiceUi>) -> Self {
        Self { ui, timeout: None }
    }

    /// Resolve to an empty selection if the user has not decided within
    /// `timeout`. `None` waits forever.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Present `request` and wait for exactly one decision.
    pub async fn resolve(&self, request: &InputRequest) -> InputResponse {
        let presentation = ChoicePresentation::from_request(request);
        let (reply, rx) = ChoiceReply::channel();

        info!(
            key = request.key.as_str(),
            options = request.options.len(),
            "input requested by worker"
        );
        self.ui.show(presentation.clone(), reply);

        let outcome = match self.timeout {
            Some(limit) => {
                if let Ok(received) = tokio::time::timeout(limit, rx).await {
                    received.unwrap_or(ChoiceOutcome::Dismissed)
                } else {
                    warn!(
                        key = request.key.as_str(),
                        timeout = ?limit,
                        "input request timed out, answering with empty selection"
                    );
                    ChoiceOutcome::Dismissed
                }
            }
            None => rx.await.unwrap_or(ChoiceOutcome::Dismissed),
        };

        let value = match outcome {
            ChoiceOutcome::Accepted(chosen) => presentation.selection(&chosen),
            ChoiceOutcome::Dismissed => Vec::new(),
        };

        debug!(
            key = request.key.as_str(),
            selected = value.len(),
            "input request resolved"
        );
        InputResponse {
            key: request.key.clone(),
            value,
        }
    }
}
