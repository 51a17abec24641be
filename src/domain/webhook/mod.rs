//! Webhook module - authentication of inbound transport deliveries.

mod errors;
mod verifier;

pub use errors::WebhookError;
pub use verifier::{sign_payload, verify_token_matches, SignatureVerifier, SIGNATURE_HEADER};
