use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Event name the live feed server listens on for data reloads
pub const RELOAD_EVENT: &str = "onFts-reload";

/// An inbound socket.io event with its arguments already decoded.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LiveEvent {
    #[serde(rename = "event")]
    pub name: String,
    pub args: Vec<Value>,
}

/// Payload of [`RELOAD_EVENT`]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub provider: String,
    pub route: String,
}

impl ReloadRequest {
    pub fn to_payload(&self) -> Value {
        json!({ "provider": self.provider, "route": self.route })
    }
}

/// What happened to one emit that expected an acknowledgement.
///
/// Failures are data here, not errors, so a bad send never tears down the
/// live session.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AckOutcome {
    pub event: String,
    pub ok: bool,
    pub error: Option<String>,
    pub ack: Option<Value>,
}

impl AckOutcome {
    pub fn acked(event: &str, ack: Value) -> Self {
        AckOutcome {
            event: event.to_string(),
            ok: true,
            error: None,
            ack: Some(ack),
        }
    }

    pub fn failed(event: &str, error: impl ToString) -> Self {
        AckOutcome {
            event: event.to_string(),
            ok: false,
            error: Some(error.to_string()),
            ack: None,
        }
    }
}
