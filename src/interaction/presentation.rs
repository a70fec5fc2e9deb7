//! UI-facing projection of an input request.

use std::path::Path;

use crate::protocol::event::InputRequest;

/// Label of the synthetic entry that selects every option.
pub const SELECT_ALL_LABEL: &str = "🔹 Select all";
/// Label of the synthetic entry that cancels the exchange.
pub const CANCEL_LABEL: &str = "❌ Cancel";

/// Role of one entry in a [`ChoicePresentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    /// Synthetic entry selecting every option.
    SelectAll,
    /// Synthetic entry answering with an empty selection.
    Cancel,
    /// A real option.
    Option,
}

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    /// Entry role.
    pub kind: ChoiceKind,
    /// Short display label.
    pub label: String,
    /// Full option value; `None` for synthetic entries.
    pub payload: Option<String>,
}

/// Ephemeral choice set shown for one interactive exchange.
///
/// Items are always ordered: select-all, cancel, then one entry per option
/// in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoicePresentation {
    /// Title shown above the items.
    pub title: String,
    /// Entries in display order.
    pub items: Vec<ChoiceItem>,
}

impl ChoicePresentation {
    /// Project `request` into a presentation.
    #[must_use]
    pub fn from_request(request: &InputRequest) -> Self {
        let mut items = Vec::with_capacity(request.options.len() + 2);
        items.push(ChoiceItem {
            kind: ChoiceKind::SelectAll,
            label: SELECT_ALL_LABEL.to_owned(),
            payload: None,
        });
        items.push(ChoiceItem {
            kind: ChoiceKind::Cancel,
            label: CANCEL_LABEL.to_owned(),
            payload: None,
        });
        items.extend(request.options.iter().map(|option| ChoiceItem {
            kind: ChoiceKind::Option,
            label: short_label(option),
            payload: Some(option.clone()),
        }));

        Self {
            title: request.prompt.clone(),
            items,
        }
    }

    /// Apply the selection rule to the indices the user accepted.
    ///
    /// Cancel wins over everything, then select-all, then the chosen
    /// options in presentation order. Out-of-range indices and empty
    /// payloads are ignored.
    #[must_use]
    pub fn selection(&self, chosen: &[usize]) -> Vec<String> {
        let picked = |kind: ChoiceKind| {
            chosen
                .iter()
                .filter_map(|&i| self.items.get(i))
                .any(|item| item.kind == kind)
        };

        if picked(ChoiceKind::Cancel) {
            return Vec::new();
        }

        if picked(ChoiceKind::SelectAll) {
            return self.option_payloads(|_| true);
        }

        self.option_payloads(|index| chosen.contains(&index))
    }

    fn option_payloads(&self, include: impl Fn(usize) -> bool) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .filter(|(index, item)| item.kind == ChoiceKind::Option && include(*index))
            .filter_map(|(_, item)| item.payload.clone())
            .filter(|payload| !payload.is_empty())
            .collect()
    }
}

/// File name of a path-like option, or the option itself.
fn short_label(option: &str) -> String {
    Path::new(option)
        .file_name()
        .map_or_else(|| option.to_owned(), |name| name.to_string_lossy().into_owned())
}
