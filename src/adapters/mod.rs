//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the conversation engine to external systems:
//! - `storage` - Session stores (file, in-memory)
//! - `messaging` - Outbound chat transport (Cloud API, recording)
//! - `marketplace` - Marketplace domain services (in-memory)
//! - `classifier` - Webhook payload classification
//! - `http` - Inbound webhook endpoints

pub mod classifier;
pub mod http;
pub mod marketplace;
pub mod messaging;
pub mod storage;

pub use classifier::WhatsAppClassifier;
pub use http::{webhook_router, WebhookAppState};
pub use marketplace::InMemoryMarketplace;
pub use messaging::{CloudApiConfig, CloudApiMessenger, RecordingMessenger, SentMessage};
pub use storage::{FileSessionStore, InMemorySessionStore};
