/// JSON control/transcript messages exchanged with the client (spec S6,
/// S9 "Dynamic JSON messages"). Upstream text frames are parsed into this
/// tagged enum; anything that doesn't match a known shape falls into
/// `Passthrough` and is forwarded verbatim, unexamined.
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "connected")]
    Connected,

    #[serde(rename = "transcript")]
    Transcript { transcript: String },

    #[serde(rename = "response")]
    Response { text: String },

    #[serde(rename = "playback_clear_buffer")]
    PlaybackClearBuffer,

    #[serde(rename = "error")]
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },

    /// Any JSON object from upstream that doesn't match a known `type`.
    /// Relayed unchanged; never constructed from scratch.
    #[serde(skip)]
    Passthrough(Value),
}

impl ClientMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ClientMessage::Error {
            error: message.into(),
            details: None,
        }
    }

    pub fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        ClientMessage::Error {
            error: message.into(),
            details: Some(details.into()),
        }
    }

    /// Parse raw upstream text into a known variant, or `Passthrough` if
    /// the `type` tag is absent or unrecognized.
    pub fn from_upstream_text(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        match serde_json::from_value::<ClientMessage>(value.clone()) {
            Ok(msg) => Ok(msg),
            Err(_) => Ok(ClientMessage::Passthrough(value)),
        }
    }

    /// Serialize for sending to the client over the text channel.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        match self {
            ClientMessage::Passthrough(value) => serde_json::to_string(value),
            other => serde_json::to_string(other),
        }
    }
}
