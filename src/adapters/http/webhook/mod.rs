//! Webhook HTTP adapter - entry point of every inbound chat message.

mod dto;
mod handlers;
mod processed_messages;
mod routes;

pub use dto::{DeliveryResponse, ErrorResponse, HealthResponse, VerifyQuery};
pub use handlers::{
    health, receive_delivery, verify_subscription, WebhookApiError, WebhookAppState,
};
pub use processed_messages::ProcessedMessages;
pub use routes::webhook_router;
