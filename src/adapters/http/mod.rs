//! HTTP adapters - axum endpoints.

pub mod webhook;

pub use webhook::{webhook_router, WebhookAppState};
