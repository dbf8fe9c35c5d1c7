//! Webhook signature validation

use std::{fmt, time::Duration};

use chrono::Utc;
use constant_time_eq::constant_time_eq;
use hmac::{digest::InvalidLength, Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// The signature fields of an incoming webhook
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSignature {
    /// Unix timestamp, in seconds
    #[serde(default)]
    pub timestamp: String,

    /// Random token
    #[serde(default)]
    pub token: String,

    /// Hex-encoded HMAC-SHA256 of `timestamp` followed by `token`
    #[serde(default)]
    pub signature: String,
}

/// Verifies webhook signatures with a shared signing key.
///
/// By default only the signature is checked. [`WebhookValidator::with_max_age`]
/// additionally rejects webhooks whose timestamp is too far from now.
#[derive(Clone)]
pub struct WebhookValidator {
    signing_key: String,
    max_age: Option<Duration>,
}

impl fmt::Debug for WebhookValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookValidator")
            .field("signing_key", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl WebhookValidator {
    /// Creates a validator for `signing_key`
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
            max_age: None,
        }
    }

    /// Rejects webhooks whose timestamp differs from now by more than `max_age`
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// The configured freshness window, if any
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Computes the hex signature for `timestamp` and `token`
    pub fn sign(&self, timestamp: &str, token: &str) -> Result<String, InvalidLength> {
        let mut mac = HmacSha256::new_from_slice(self.signing_key.as_bytes())?;
        mac.update(timestamp.as_bytes());
        mac.update(token.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Whether `signature` is the valid signature of `timestamp` and `token`.
    ///
    /// Empty fields are invalid. Never fails: anything malformed is simply
    /// `false`.
    pub fn validate(&self, timestamp: &str, token: &str, signature: &str) -> bool {
        if timestamp.is_empty() || token.is_empty() || signature.is_empty() {
            debug!("webhook is missing signature fields");
            return false;
        }

        if let Some(max_age) = self.max_age {
            if !is_fresh(timestamp, max_age) {
                debug!(timestamp, "webhook timestamp is outside the allowed window");
                return false;
            }
        }

        let expected = match self.sign(timestamp, token) {
            Ok(expected) => expected,
            Err(error) => {
                debug!(%error, "webhook signing key was rejected");
                return false;
            }
        };

        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            debug!("webhook signature mismatch");
            return false;
        }

        true
    }

    /// Validates the fields of a deserialized webhook
    pub fn validate_payload(&self, webhook: &WebhookSignature) -> bool {
        self.validate(&webhook.timestamp, &webhook.token, &webhook.signature)
    }
}

fn is_fresh(timestamp: &str, max_age: Duration) -> bool {
    let Ok(timestamp) = timestamp.parse::<i64>() else {
        return false;
    };

    let age = Utc::now().timestamp().abs_diff(timestamp);

    age <= max_age.as_secs()
}
