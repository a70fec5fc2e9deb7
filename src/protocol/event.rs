//! Worker event model and the single decode boundary.
//!
//! Every complete line read from the worker's stdout passes through
//! [`decode_line`] exactly once. The wire format is one JSON object per line
//! with a `type` discriminator:
//!
//! | `type`          | Required fields              | Maps to                        |
//! |-----------------|------------------------------|--------------------------------|
//! | `status`        | `message`                    | [`WorkerEvent::Status`]        |
//! | `error`         | `message`                    | [`WorkerEvent::Error`]         |
//! | `input_request` | `key`, `prompt`, `options`   | [`WorkerEvent::InputRequest`]  |
//! | *(anything else)* | —                          | [`WorkerEvent::Unrecognized`]  |
//!
//! Decoding never fails: workers are free to print diagnostic text on the
//! same stream, and such lines surface as [`WorkerEvent::Unrecognized`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A worker's request for the user to pick among options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputRequest {
    /// Correlation key echoed back in the [`InputResponse`].
    pub key: String,
    /// Title shown to the user.
    pub prompt: String,
    /// Selectable values, in display order.
    pub options: Vec<String>,
}

/// Reply written to the worker's stdin for one [`InputRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputResponse {
    /// Key of the request being answered.
    pub key: String,
    /// Selected option values; empty means cancelled or nothing selected.
    pub value: Vec<String>,
}

impl InputResponse {
    /// Empty selection for `key`.
    #[must_use]
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Serialise to a single JSON line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`](crate::AppError::Protocol) if
    /// serialisation fails.
    pub fn to_line(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::AppError::Protocol(format!("failed to serialise input response: {e}"))
        })
    }
}

/// One decoded line of worker output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Informational progress update.
    Status {
        /// Text to display.
        message: String,
        /// Name of the worker step that emitted the update, when provided.
        /// Non-string tags are kept in their JSON form.
        node: Option<String>,
    },
    /// Unrecoverable worker-side failure; terminal for the session.
    Error {
        /// Worker-provided failure description.
        message: String,
    },
    /// Worker is blocked until a correlated [`InputResponse`] arrives.
    InputRequest(InputRequest),
    /// Line that is not a recognised structured event.
    Unrecognized {
        /// The line exactly as received.
        raw: String,
    },
}

impl WorkerEvent {
    /// Short name used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
            Self::InputRequest(_) => "input_request",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Wire envelope; anything serde rejects becomes `Unrecognized`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Status {
        message: String,
        #[serde(default, deserialize_with = "lenient_tag")]
        node: Option<String>,
    },
    Error {
        message: String,
    },
    InputRequest(InputRequest),
}

/// Decode one line of worker output.
///
/// Invalid JSON, a missing or unknown `type`, and a recognised `type` with
/// missing required fields all yield [`WorkerEvent::Unrecognized`] carrying
/// the original line.
#[must_use]
pub fn decode_line(line: &str) -> WorkerEvent {
    match serde_json::from_str::<WireEvent>(line) {
        Ok(WireEvent::Status { message, node }) => WorkerEvent::Status { message, node },
        Ok(WireEvent::Error { message }) => WorkerEvent::Error { message },
        Ok(WireEvent::InputRequest(request)) => WorkerEvent::InputRequest(request),
        Err(_) => WorkerEvent::Unrecognized {
            raw: line.to_owned(),
        },
    }
}

/// Accept any JSON value for an informational tag: strings as-is, `null` as
/// absent, anything else in its compact JSON form.
fn lenient_tag<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(tag) => Some(tag),
        other => Some(other.to_string()),
    })
}
