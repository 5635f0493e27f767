//! Inbound realtime commands.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A command sent by a connected client, tagged by its `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    FetchData,
    NewMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}.")]
    Unknown(String),
    #[error("Malformed command: {0}")]
    Malformed(String),
}

impl ClientCommand {
    pub const NAMES: &'static [&'static str] = &["fetch_data", "new_message"];

    /// Decode a text frame, telling unknown command names apart from broken payloads.
    pub fn decode(text: &str) -> Result<Self, CommandError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CommandError::Malformed(e.to_string()))?;

        let name = value
            .get("command")
            .and_then(|command| command.as_str())
            .ok_or_else(|| CommandError::Malformed("missing command field".to_string()))?;

        if !Self::NAMES.contains(&name) {
            return Err(CommandError::Unknown(name.to_string()));
        }

        serde_json::from_value(value).map_err(|e| CommandError::Malformed(e.to_string()))
    }
}
