//! Domain layer: message building and webhook verification

pub mod messaging;
pub mod webhooks;
