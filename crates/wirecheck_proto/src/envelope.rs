//! Tagged-envelope decoding.
//!
//! A frame is first parsed as JSON. Objects carrying a non-null `type` tag are matched against the known tags;
//! everything else, including unparseable bytes, becomes [`Envelope::Raw`] text.
//!
//! | Frame | Envelope |
//! |---|---|
//! | not JSON, not an object, or no `type` | `Raw` |
//! | `{"type": "Success"}` | `Outcome(Success)` |
//! | `{"type": "Error", "err": .., "data": ..}` | `Outcome(Error)` with message and detail |
//! | `{"type": "Info", "data": ..}` | `Progress` |
//! | any other tag | `Raw` |

use std::fmt;

use serde_json::{Map, Value};

pub const TAG_KEY: &str = "type";
pub const TAG_SUCCESS: &str = "Success";
pub const TAG_ERROR: &str = "Error";
pub const TAG_INFO: &str = "Info";

/// Kind of a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Error,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => f.write_str(TAG_SUCCESS),
            OutcomeKind::Error => f.write_str(TAG_ERROR),
        }
    }
}

/// A terminal envelope: the target's verdict on the current command.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    /// Human-readable failure reason (the `err` field).
    pub message: Option<String>,
    /// Arbitrary payload attached to the outcome (the `data` field).
    pub detail: Option<Value>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            kind: OutcomeKind::Success,
            message: None,
            detail: None,
        }
    }

    pub fn error(message: Option<String>, detail: Option<Value>) -> Self {
        Self {
            kind: OutcomeKind::Error,
            message,
            detail,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// The decoded interpretation of one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `Success` or `Error`: ends the current test.
    Outcome(Outcome),
    /// `Info`: progress text, not terminal.
    Progress { message: String },
    /// Anything that is not a recognized tagged object.
    Raw { text: String },
}

impl Envelope {
    pub fn progress(message: impl Into<String>) -> Self {
        Envelope::Progress {
            message: message.into(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Envelope::Raw { text: text.into() }
    }

    /// Classify a frame. Never fails.
    pub fn decode(frame: &[u8]) -> Envelope {
        match serde_json::from_slice::<Value>(frame) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields).unwrap_or_else(|| Self::raw_from(frame)),
            _ => Self::raw_from(frame),
        }
    }

    /// `true` for `Success` and `Error` outcomes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Envelope::Outcome(_))
    }

    fn from_fields(fields: &Map<String, Value>) -> Option<Envelope> {
        let tag = match fields.get(TAG_KEY) {
            None | Some(Value::Null) => return None,
            Some(Value::String(tag)) => tag.as_str(),
            // Non-string tags never match a known tag.
            Some(_) => return None,
        };

        match tag {
            TAG_SUCCESS => Some(Envelope::Outcome(Outcome::success())),
            TAG_ERROR => {
                let message = match fields.get("err") {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(render_value(value)),
                };
                Some(Envelope::Outcome(Outcome::error(message, fields.get("data").cloned())))
            }
            TAG_INFO => Some(Envelope::Progress {
                message: fields.get("data").map(render_value).unwrap_or_default(),
            }),
            _ => None,
        }
    }

    fn raw_from(frame: &[u8]) -> Envelope {
        Envelope::Raw {
            text: String::from_utf8_lossy(frame).into_owned(),
        }
    }
}

/// Render a JSON value for a log line: strings verbatim, everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
