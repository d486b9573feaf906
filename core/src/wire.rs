//! JSON framing for messages that cross a channel as text.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors raised while framing messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// The message could not be rendered as JSON.
    #[error("failed to encode frame")]
    Encode(#[source] serde_json::Error),
    /// The frame is not a well-formed message of the expected family.
    #[error("malformed frame")]
    Decode(#[source] serde_json::Error),
}

/// Renders a message as a single-line JSON frame.
pub fn encode<T: Serialize>(message: &T) -> Result<String, WireError> {
    serde_json::to_string(message).map_err(WireError::Encode)
}

/// Parses a JSON frame into a message.
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T, WireError> {
    serde_json::from_str(frame).map_err(WireError::Decode)
}
