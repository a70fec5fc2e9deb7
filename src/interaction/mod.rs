//! Interactive exchanges between the worker and the user.
//!
//! - `presentation`: the [`ChoicePresentation`](presentation::ChoicePresentation)
//!   projection and its selection rule.
//! - `handler`: the [`ChoiceUi`](handler::ChoiceUi) seam and the one-shot
//!   [`InteractiveHandler`](handler::InteractiveHandler).
//! - `terminal`: the `inquire`-based chooser used by the binary.

pub mod handler;
pub mod presentation;
pub mod terminal;
