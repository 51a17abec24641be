//! Webhook signature verification.
//!
//! The chat transport signs every delivery with HMAC-SHA256 over the raw
//! request body using the app secret, and sends it as
//! `X-Hub-Signature-256: sha256=<hex>`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifier for webhook payload signatures.
pub struct SignatureVerifier {
    app_secret: Secret<String>,
}

impl SignatureVerifier {
    /// Creates a verifier for the given app secret.
    pub fn new(app_secret: impl Into<String>) -> Self {
        Self {
            app_secret: Secret::new(app_secret.into()),
        }
    }

    /// Verifies `payload` against the signature header value.
    ///
    /// # Errors
    ///
    /// - `MissingSignature` - no header value was supplied
    /// - `MalformedSignature` - wrong prefix or non-hex digest
    /// - `InvalidSignature` - digest does not match
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), WebhookError> {
        let header = header.ok_or(WebhookError::MissingSignature)?;
        let hex_digest = header
            .trim()
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| WebhookError::MalformedSignature("missing sha256= prefix".to_string()))?;
        let provided = hex::decode(hex_digest)
            .map_err(|_| WebhookError::MalformedSignature("invalid hex digest".to_string()))?;

        let expected = self.compute(payload)?;
        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn compute(&self, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.app_secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Compares the subscription verify token in constant time.
pub fn verify_token_matches(expected: &str, provided: &str) -> bool {
    constant_time_compare(expected.as_bytes(), provided.as_bytes())
}

/// Computes a signature header value for test fixtures.
pub fn sign_payload(app_secret: &str, payload: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}
