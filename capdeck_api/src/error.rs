use std::fmt::Display;

use serde_json::Value;

use crate::transport::TransportError;

/// Why a request failed, carried next to the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Non-2xx response without a more specific meaning.
    Http,
    /// Streaming cannot restart yet.
    Cooldown { remaining_ms: u64 },
    /// Neither the network nor the offline cache could answer.
    Offline,
    /// The request never produced a response.
    Transport,
    /// The response did not have the expected shape.
    Decode,
}

/// The single error kind surfaced by the API client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestFailure {
    pub message: String,
    pub reason: FailureReason,
    pub status: Option<u16>,
}

impl RequestFailure {
    /// Builds the failure for a non-2xx response.
    ///
    /// The message comes from the JSON `message` field, then the `error`
    /// field. A JSON body with neither yields `HTTP <status>`; a body that
    /// is not JSON is used verbatim unless it is empty.
    pub fn from_response(status: u16, body: &str) -> Self {
        let fallback = format!("HTTP {status}");

        let (message, json) = match serde_json::from_str::<Value>(body) {
            Ok(json) => {
                let message = text_field(&json, "message")
                    .or_else(|| text_field(&json, "error"))
                    .map_or(fallback, str::to_owned);
                (message, Some(json))
            }
            Err(_) if body.trim().is_empty() => (fallback, None),
            Err(_) => (body.to_owned(), None),
        };

        let reason = classify(status, json.as_ref());

        Self {
            message,
            reason,
            status: Some(status),
        }
    }

    pub fn transport(err: &TransportError) -> Self {
        Self {
            message: err.to_string(),
            reason: FailureReason::Transport,
            status: None,
        }
    }

    pub fn decode(err: impl Display) -> Self {
        Self {
            message: format!("unexpected response: {err}"),
            reason: FailureReason::Decode,
            status: None,
        }
    }

    pub fn is_cooldown(&self) -> bool {
        matches!(self.reason, FailureReason::Cooldown { .. })
    }
}

fn text_field<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn classify(status: u16, json: Option<&Value>) -> FailureReason {
    let remaining = json
        .and_then(|j| j.get("cooldownRemainingMs"))
        .and_then(Value::as_u64);

    if let Some(remaining_ms) = remaining {
        return FailureReason::Cooldown { remaining_ms };
    }

    match status {
        429 => FailureReason::Cooldown { remaining_ms: 0 },
        503 if json.and_then(|j| text_field(j, "error")) == Some("Offline") => {
            FailureReason::Offline
        }
        _ => FailureReason::Http,
    }
}
