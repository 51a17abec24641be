//! Marketplace entities the conversation flows act upon.
//!
//! These are read models and commands exchanged with the marketplace
//! services; their persistence lives behind the ports.

mod agreement;
mod flash_deal;
mod offer;
mod product_request;

pub use agreement::{Agreement, AgreementStatus, NewAgreement};
pub use flash_deal::{FlashDeal, NewFlashDeal};
pub use offer::Offer;
pub use product_request::{ProductRequest, ProductResponse};

/// Formats minor units as a price string, e.g. `1250` -> `"12.50"`.
pub fn format_amount(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_amount_pads_cents() {
        assert_eq!(format_amount(1_250), "12.50");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(100_000), "1000.00");
    }
}
