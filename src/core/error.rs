//! Error taxonomy for the chat client.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection or transport failure, including mid-stream disconnects
    #[error("Network error: {0}")]
    Network(String),

    /// Payload didn't match any accepted shape
    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Feedback failed: {0}")]
    Feedback(String),

    /// Another user-triggered action is still in progress
    #[error("Busy: {0}")]
    Busy(String),

    /// Programmer error in the caller, e.g. opening a second streaming
    /// message or replacing the log while a message is open
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}
