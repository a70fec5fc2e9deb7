//! Terminal [`ChoiceUi`] backed by `inquire`.

use inquire::list_option::ListOption;
use inquire::{InquireError, MultiSelect};
use tracing::{info, warn};

use crate::interaction::handler::{ChoiceReply, ChoiceUi};
use crate::interaction::presentation::{ChoiceItem, ChoiceKind, ChoicePresentation};

/// Multi-select prompt on the controlling terminal.
///
/// Space toggles, Enter accepts, Esc dismisses.
///
/// The prompt runs on a blocking thread and cannot be withdrawn once shown.
/// If the exchange ends first (the worker exited or the interaction timeout
/// fired), the prompt stays on screen until the user answers it, and that
/// answer is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalChooser;

impl ChoiceUi for TerminalChooser {
    fn show(&self, presentation: ChoicePresentation, reply: ChoiceReply) {
        // inquire blocks on terminal input.
        tokio::task::spawn_blocking(move || {
            let labels: Vec<String> = presentation.items.iter().map(display_label).collect();
            let answer = MultiSelect::new(&presentation.title, labels).raw_prompt();
            deliver(reply, answer);
        });
    }
}

/// Resolve `reply` from a prompt result.
///
/// Cancel and interrupt dismiss; other prompt failures dismiss with a
/// warning. Returns `false` when the exchange had already been abandoned
/// and the answer went nowhere.
pub fn deliver(reply: ChoiceReply, answer: Result<Vec<ListOption<String>>, InquireError>) -> bool {
    if reply.is_abandoned() {
        info!("terminal chooser: answer arrived after the exchange ended, discarding");
        return false;
    }

    match answer {
        Ok(selected) => {
            reply.accept(selected.into_iter().map(|option| option.index).collect());
        }
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            reply.dismiss();
        }
        Err(err) => {
            warn!(error = %err, "terminal chooser failed, treating as dismissed");
            reply.dismiss();
        }
    }
    true
}

fn display_label(item: &ChoiceItem) -> String {
    match (&item.kind, &item.payload) {
        (ChoiceKind::Option, Some(payload)) if payload != &item.label => {
            format!("{}  ({payload})", item.label)
        }
        _ => item.label.clone(),
    }
}
