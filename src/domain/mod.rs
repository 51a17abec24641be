//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `conversation` - Flow/step state machine vocabulary: sessions, events, descriptors
//! - `marketplace` - Entities the flows act upon (agreements, offers, deals)
//! - `webhook` - Authentication of transport deliveries

pub mod conversation;
pub mod foundation;
pub mod marketplace;
pub mod webhook;
