//! Buyer product requests and seller responses.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductRequestId, UserIdentifier};

/// An open request from a buyer, visible to sellers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRequest {
    pub id: ProductRequestId,
    pub product_name: String,
    pub buyer_note: Option<String>,
}

/// A seller's answer to a product request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub request_id: ProductRequestId,
    pub seller: UserIdentifier,
    pub price_cents: u64,
    pub photo_media_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}
