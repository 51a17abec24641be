//! Time-boxed discounted deals.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{FlashDealId, Timestamp, UserIdentifier};

/// Command to publish a flash deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlashDeal {
    pub title: String,
    pub discount_percent: u8,
    pub quantity: u32,
    pub duration_hours: u32,
}

/// A published flash deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashDeal {
    pub id: FlashDealId,
    pub owner: UserIdentifier,
    pub title: String,
    pub discount_percent: u8,
    pub quantity: u32,
    pub ends_at: Timestamp,
}
