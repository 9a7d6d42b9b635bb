//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while framing or parsing protocol lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown direction {0:?}")]
    UnknownDirection(String),

    #[error("Line longer than {0} bytes")]
    LineTooLong(usize),

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
}
