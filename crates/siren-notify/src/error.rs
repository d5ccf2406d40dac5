//! Error types for the notification layer.

use thiserror::Error;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the notification layer.
#[derive(Debug, Error)]
pub enum Error {
    /// No channel registered for a notify method.
    #[error("No channel for method: {0}")]
    NoChannel(String),

    /// Channel is disabled.
    #[error("Channel disabled: {0}")]
    ChannelDisabled(String),

    /// Delivery attempt failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Invalid channel configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<Error> for siren_core::Error {
    fn from(e: Error) -> Self {
        siren_core::Error::Notify(e.to_string())
    }
}
