//! Mailgun HTTP API sender

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{
    messaging::{BatchMessage, Payload, SendResponse, Sender, TransportError},
    webhooks::WebhookValidator,
};

/// Mailgun configuration
#[derive(Clone, Debug, Parser)]
pub struct MailgunConfig {
    /// The Mailgun private API key
    #[clap(long, env = "MAILGUN_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// The Mailgun domain to send from
    #[clap(long, env = "MAILGUN_DOMAIN")]
    pub domain: String,

    /// The API base URL, e.g. `https://api.eu.mailgun.net/v3` for EU domains
    #[clap(long, env = "MAILGUN_BASE_URL", default_value = "https://api.mailgun.net/v3")]
    pub base_url: String,

    /// Request timeout in seconds; no timeout when unset
    #[clap(long, env = "MAILGUN_TIMEOUT")]
    pub timeout: Option<u64>,
}

/// Mailgun sender
#[derive(Debug, Clone)]
pub struct MailgunClient {
    config: MailgunConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

impl MailgunClient {
    /// Create a new Mailgun client
    pub fn new(config: MailgunConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    /// The configured domain
    pub fn domain(&self) -> &str {
        &self.config.domain
    }

    /// Starts a message sent from the configured domain
    pub fn new_batch_message(&self) -> BatchMessage {
        BatchMessage::new(self.config.domain.clone())
    }

    /// A webhook validator keyed with the API key
    pub fn webhook_validator(&self) -> WebhookValidator {
        WebhookValidator::new(self.config.api_key.clone())
    }

    fn messages_url(&self, domain: &str) -> String {
        format!(
            "{}/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            domain
        )
    }
}

#[async_trait]
impl Sender for MailgunClient {
    async fn send(&self, domain: &str, payload: &Payload) -> Result<SendResponse, TransportError> {
        let url = self.messages_url(domain);

        debug!(%url, fields = payload.len(), "posting message");

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .form(&payload.form_fields())
            .send()
            .await
            .context("failed to reach Mailgun")?;

        let status = response.status();

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => {
                    warn!(%error, "failed to read Mailgun error response");
                    format!("failed to read response body: {error}")
                }
            };
            let message = serde_json::from_str::<MailgunResponse>(&body)
                .map(|error| error.message)
                .unwrap_or(body);

            warn!(status = status.as_u16(), %message, "Mailgun rejected the message");

            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: MailgunResponse = response
            .json()
            .await
            .context("failed to decode Mailgun response")?;

        Ok(SendResponse {
            id: body.id,
            message: body.message,
            status_code: status.as_u16(),
        })
    }
}
