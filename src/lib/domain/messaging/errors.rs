//! Error types for the messaging module

use thiserror::Error;
use tracing::debug;

use super::EmailAddressError;

/// Errors raised locally while building a message, before anything is sent
#[derive(Debug, Error)]
pub enum MessageError {
    /// Neither an HTML nor a text body was set
    #[error("no email body set")]
    NoBody,

    /// The message has no recipients
    #[error("no recipients specified")]
    NoRecipients,

    /// A recipient variable used for substitution is a map or a list
    #[error("recipient variable \"{0}\" is nested and cannot be substituted")]
    NestedRecipientVariable(String),

    /// The stored delivery time could not be parsed
    #[error("invalid delivery time \"{0}\"")]
    InvalidDeliveryTime(String),

    /// Invalid email address
    #[error(transparent)]
    InvalidEmailAddress(#[from] EmailAddressError),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        debug!("serde_json::Error -> MessageError");

        MessageError::UnknownError(err.into())
    }
}

/// Errors raised by a [`Sender`](super::Sender) while delivering a payload
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider answered with a non-success status
    #[error("provider rejected the message with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,

        /// Message returned by the provider
        message: String,
    },

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

/// Errors that can occur when sending a message
#[derive(Debug, Error)]
pub enum SendError {
    /// The message could not be assembled
    #[error(transparent)]
    Message(#[from] MessageError),

    /// The sender failed to deliver the payload
    #[error(transparent)]
    Transport(#[from] TransportError),
}
