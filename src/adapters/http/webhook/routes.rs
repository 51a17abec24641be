//! Axum router for the webhook endpoints.

use axum::{routing::get, Router};

use super::handlers::{health, receive_delivery, verify_subscription, WebhookAppState};

/// Create the webhook router.
///
/// # Routes
///
/// - `GET /webhook` - Subscription verification handshake
/// - `POST /webhook` - Inbound message delivery (signature verified)
/// - `GET /health` - Liveness check
pub fn webhook_router(state: WebhookAppState) -> Router {
    Router::new()
        .route("/webhook", get(verify_subscription).post(receive_delivery))
        .route("/health", get(health))
        .with_state(state)
}
