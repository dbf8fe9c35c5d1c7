//! Webhooks module.

mod validator;

pub use validator::{WebhookSignature, WebhookValidator};
