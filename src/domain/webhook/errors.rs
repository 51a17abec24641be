//! Webhook verification errors.

use thiserror::Error;

/// Errors raised while authenticating an inbound webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header: {0}")]
    MalformedSignature(String),

    #[error("Signature verification failed")]
    InvalidSignature,
}
