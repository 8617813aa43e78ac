use std::str::FromStr;

use thiserror::Error;

/// Error types for SQS consumer operations.
///
/// This enum represents all possible errors that can occur while configuring
/// the client, sending messages, or acknowledging and releasing received ones.
#[derive(Debug, Error)]
pub enum SqsConsumerError {
    /// A required constructor field is missing.
    #[error("missing a required parameter: {0}")]
    Configuration(String),

    /// The payload handed to a send operation cannot be sent.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A payload could not be encoded, or a message body could not be decoded.
    #[error("failed to serialize message body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A remote call to the queue failed.
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("{0}")]
    GenericError(#[from] GenericError),
}

impl SqsConsumerError {
    pub(crate) fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        SqsConsumerError::Transport {
            operation,
            message: message.into(),
        }
    }
}

/// Generic error type for handlers to signal an application failure.
#[derive(Debug, Error)]
pub struct GenericError(String);

impl GenericError {
    /// Creates a new `GenericError` with the provided message.
    pub fn new(message: String) -> Self {
        GenericError(message)
    }
}

impl std::fmt::Display for GenericError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GenericError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(GenericError::new(s.to_string()))
    }
}

impl From<String> for GenericError {
    fn from(s: String) -> Self {
        GenericError::new(s)
    }
}

impl From<&str> for GenericError {
    fn from(s: &str) -> Self {
        GenericError::new(s.to_string())
    }
}
