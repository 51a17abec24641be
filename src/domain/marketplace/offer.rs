//! Standing offers published by a seller.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OfferId, UserIdentifier};

/// A seller's offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub owner: UserIdentifier,
    pub title: String,
    pub price_cents: u64,
    pub stock: u32,
}
