//! Marketplace Service Ports - Domain operations invoked by terminal steps.
//!
//! Each flow talks to one service. Every operation returns a value or a
//! typed [`ServiceError`]; flows never assume success.

use async_trait::async_trait;

use crate::domain::foundation::{AgreementId, OfferId, ProductRequestId, UserIdentifier};
use crate::domain::marketplace::{
    Agreement, FlashDeal, NewAgreement, NewFlashDeal, Offer, ProductRequest, ProductResponse,
};

/// Errors returned by marketplace services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service timed out")]
    Timeout,
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        ServiceError::NotFound { entity, id }
    }
}

/// Agreements owned by a user.
#[async_trait]
pub trait AgreementService: Send + Sync {
    async fn list_for(&self, owner: &UserIdentifier) -> Result<Vec<Agreement>, ServiceError>;

    async fn get(
        &self,
        owner: &UserIdentifier,
        id: AgreementId,
    ) -> Result<Option<Agreement>, ServiceError>;

    async fn create(
        &self,
        owner: &UserIdentifier,
        agreement: NewAgreement,
    ) -> Result<Agreement, ServiceError>;

    async fn mark_complete(
        &self,
        owner: &UserIdentifier,
        id: AgreementId,
    ) -> Result<Agreement, ServiceError>;
}

/// Offers published by a seller.
#[async_trait]
pub trait OfferService: Send + Sync {
    async fn list_for(&self, owner: &UserIdentifier) -> Result<Vec<Offer>, ServiceError>;

    async fn get(&self, owner: &UserIdentifier, id: OfferId) -> Result<Option<Offer>, ServiceError>;

    async fn update_price(
        &self,
        owner: &UserIdentifier,
        id: OfferId,
        price_cents: u64,
    ) -> Result<Offer, ServiceError>;

    async fn delete(&self, owner: &UserIdentifier, id: OfferId) -> Result<(), ServiceError>;
}

/// Buyer requests a seller can respond to.
#[async_trait]
pub trait ProductRequestService: Send + Sync {
    async fn list_open(&self, seller: &UserIdentifier) -> Result<Vec<ProductRequest>, ServiceError>;

    async fn get(&self, id: ProductRequestId) -> Result<Option<ProductRequest>, ServiceError>;

    async fn submit_response(&self, response: ProductResponse) -> Result<(), ServiceError>;
}

/// Flash deal publication.
#[async_trait]
pub trait FlashDealService: Send + Sync {
    async fn create(
        &self,
        owner: &UserIdentifier,
        deal: NewFlashDeal,
    ) -> Result<FlashDeal, ServiceError>;
}
