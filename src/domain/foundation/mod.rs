//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types
//! that form the vocabulary of the marketplace bot domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{AgreementId, FlashDealId, OfferId, ProductRequestId, UserId, UserIdentifier};
pub use timestamp::Timestamp;
