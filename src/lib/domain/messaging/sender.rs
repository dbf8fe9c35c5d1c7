//! Provider client interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::mock;

use super::{Payload, TransportError};

/// The provider's answer to a send request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// Provider message ID
    pub id: String,

    /// Human readable message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,
}

/// Delivers assembled payloads to the email provider
#[async_trait]
pub trait Sender: Send + Sync + 'static {
    /// Send a payload
    ///
    /// # Arguments
    /// * `domain` - The provider domain to send from.
    /// * `payload` - The assembled message fields.
    ///
    /// # Returns
    /// The provider's [`SendResponse`], or a [`TransportError`] exactly as the
    /// transport raised it.
    async fn send(&self, domain: &str, payload: &Payload) -> Result<SendResponse, TransportError>;
}

#[cfg(test)]
mock! {
    pub Sender {}

    #[async_trait]
    impl Sender for Sender {
        async fn send(&self, domain: &str, payload: &Payload) -> Result<SendResponse, TransportError>;
    }
}
