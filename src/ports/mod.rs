//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the conversation engine and the outside world. Adapters implement these ports.
//!
//! - `SessionStore` - Per-user session persistence
//! - `Messenger` - Outbound chat messages
//! - `InputClassifier` - Transport payload normalization
//! - `AgreementService`, `OfferService`, `ProductRequestService`,
//!   `FlashDealService` - Marketplace operations used by terminal steps

mod input_classifier;
mod marketplace;
mod messenger;
mod session_store;

pub use input_classifier::InputClassifier;
pub use marketplace::{
    AgreementService, FlashDealService, OfferService, ProductRequestService, ServiceError,
};
pub use messenger::{
    Button, ListRow, ListSection, MediaSource, MessageReceipt, Messenger, MessagingError,
    OutboundMessage,
};
pub use session_store::{SessionStore, SessionStoreError};
