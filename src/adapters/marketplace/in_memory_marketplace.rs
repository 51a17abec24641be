//! In-Memory Marketplace Adapter
//!
//! Implements every marketplace service port over in-process maps.
//! Useful for testing and local development. Failures can be injected with
//! [`InMemoryMarketplace::fail_next`].

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::domain::foundation::{
    AgreementId, FlashDealId, OfferId, ProductRequestId, Timestamp, UserIdentifier,
};
use crate::domain::marketplace::{
    Agreement, AgreementStatus, FlashDeal, NewAgreement, NewFlashDeal, Offer, ProductRequest,
    ProductResponse,
};
use crate::ports::{
    AgreementService, FlashDealService, OfferService, ProductRequestService, ServiceError,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Catalog {
    agreements: BTreeMap<i64, Agreement>,
    offers: BTreeMap<i64, Offer>,
    requests: BTreeMap<i64, ProductRequest>,
    responses: Vec<ProductResponse>,
    flash_deals: Vec<FlashDeal>,
}

/// In-memory marketplace backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketplace {
    catalog: Arc<RwLock<Catalog>>,
    failures: Arc<Mutex<Vec<ServiceError>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next service call fail with `error`. Calls queue up.
    pub fn fail_next(&self, error: ServiceError) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(error);
    }

    fn take_failure(&self) -> Result<(), ServiceError> {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.remove(0))
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Keeps generated ids above explicitly inserted ones.
    fn reserve_id(&self, id: i64) {
        self.next_id.fetch_max(id, Ordering::SeqCst);
    }

    pub async fn insert_agreement(&self, agreement: Agreement) {
        self.reserve_id(agreement.id.value());
        self.catalog
            .write()
            .await
            .agreements
            .insert(agreement.id.value(), agreement);
    }

    pub async fn insert_offer(&self, offer: Offer) {
        self.reserve_id(offer.id.value());
        self.catalog.write().await.offers.insert(offer.id.value(), offer);
    }

    pub async fn insert_product_request(&self, request: ProductRequest) {
        self.reserve_id(request.id.value());
        self.catalog
            .write()
            .await
            .requests
            .insert(request.id.value(), request);
    }

    /// Every product response submitted so far.
    pub async fn responses(&self) -> Vec<ProductResponse> {
        self.catalog.read().await.responses.clone()
    }

    /// Every flash deal published so far.
    pub async fn flash_deals(&self) -> Vec<FlashDeal> {
        self.catalog.read().await.flash_deals.clone()
    }

    /// Copy of every record, for before/after comparisons.
    #[cfg(test)]
    pub(crate) async fn catalog_snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    /// Seeds a few open buyer requests and offers for local development.
    pub async fn seed_demo(&self, seller: &UserIdentifier) {
        for (name, note) in [
            ("Arabica coffee beans", Some("10 kg, roasted")),
            ("Coconut oil", None),
            ("Dried chili", Some("Delivery to Bandung")),
        ] {
            let id = self.allocate_id();
            self.insert_product_request(ProductRequest {
                id: ProductRequestId::new(id),
                product_name: name.to_string(),
                buyer_note: note.map(str::to_string),
            })
            .await;
        }
        for (title, price_cents, stock) in [("Fresh mangoes", 25_000, 40), ("Palm sugar", 18_000, 12)] {
            let id = self.allocate_id();
            self.insert_offer(Offer {
                id: OfferId::new(id),
                owner: seller.clone(),
                title: title.to_string(),
                price_cents,
                stock,
            })
            .await;
        }
    }
}

#[async_trait]
impl AgreementService for InMemoryMarketplace {
    async fn list_for(&self, owner: &UserIdentifier) -> Result<Vec<Agreement>, ServiceError> {
        self.take_failure()?;
        let catalog = self.catalog.read().await;
        Ok(catalog
            .agreements
            .values()
            .filter(|a| &a.owner == owner)
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        owner: &UserIdentifier,
        id: AgreementId,
    ) -> Result<Option<Agreement>, ServiceError> {
        self.take_failure()?;
        let catalog = self.catalog.read().await;
        Ok(catalog
            .agreements
            .get(&id.value())
            .filter(|a| &a.owner == owner)
            .cloned())
    }

    async fn create(
        &self,
        owner: &UserIdentifier,
        agreement: NewAgreement,
    ) -> Result<Agreement, ServiceError> {
        self.take_failure()?;
        let created = Agreement {
            id: AgreementId::new(self.allocate_id()),
            owner: owner.clone(),
            title: agreement.title,
            counterparty_phone: agreement.counterparty_phone,
            amount_cents: agreement.amount_cents,
            due_date: agreement.due_date,
            status: AgreementStatus::Active,
        };
        self.catalog
            .write()
            .await
            .agreements
            .insert(created.id.value(), created.clone());
        Ok(created)
    }

    async fn mark_complete(
        &self,
        owner: &UserIdentifier,
        id: AgreementId,
    ) -> Result<Agreement, ServiceError> {
        self.take_failure()?;
        let mut catalog = self.catalog.write().await;
        let agreement = catalog
            .agreements
            .get_mut(&id.value())
            .filter(|a| &a.owner == owner)
            .ok_or_else(|| ServiceError::not_found("agreement", id.value()))?;
        if agreement.status == AgreementStatus::Completed {
            return Err(ServiceError::Rejected(format!(
                "agreement {} is already completed",
                id
            )));
        }
        agreement.status = AgreementStatus::Completed;
        Ok(agreement.clone())
    }
}

#[async_trait]
impl OfferService for InMemoryMarketplace {
    async fn list_for(&self, owner: &UserIdentifier) -> Result<Vec<Offer>, ServiceError> {
        self.take_failure()?;
        let catalog = self.catalog.read().await;
        Ok(catalog
            .offers
            .values()
            .filter(|o| &o.owner == owner)
            .cloned()
            .collect())
    }

    async fn get(&self, owner: &UserIdentifier, id: OfferId) -> Result<Option<Offer>, ServiceError> {
        self.take_failure()?;
        let catalog = self.catalog.read().await;
        Ok(catalog
            .offers
            .get(&id.value())
            .filter(|o| &o.owner == owner)
            .cloned())
    }

    async fn update_price(
        &self,
        owner: &UserIdentifier,
        id: OfferId,
        price_cents: u64,
    ) -> Result<Offer, ServiceError> {
        self.take_failure()?;
        let mut catalog = self.catalog.write().await;
        let offer = catalog
            .offers
            .get_mut(&id.value())
            .filter(|o| &o.owner == owner)
            .ok_or_else(|| ServiceError::not_found("offer", id.value()))?;
        offer.price_cents = price_cents;
        Ok(offer.clone())
    }

    async fn delete(&self, owner: &UserIdentifier, id: OfferId) -> Result<(), ServiceError> {
        self.take_failure()?;
        let mut catalog = self.catalog.write().await;
        match catalog.offers.get(&id.value()) {
            Some(offer) if &offer.owner == owner => {
                catalog.offers.remove(&id.value());
                Ok(())
            }
            _ => Err(ServiceError::not_found("offer", id.value())),
        }
    }
}

#[async_trait]
impl ProductRequestService for InMemoryMarketplace {
    async fn list_open(&self, seller: &UserIdentifier) -> Result<Vec<ProductRequest>, ServiceError> {
        self.take_failure()?;
        let catalog = self.catalog.read().await;
        Ok(catalog
            .requests
            .values()
            .filter(|request| {
                !catalog
                    .responses
                    .iter()
                    .any(|r| r.request_id == request.id && &r.seller == seller)
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: ProductRequestId) -> Result<Option<ProductRequest>, ServiceError> {
        self.take_failure()?;
        Ok(self.catalog.read().await.requests.get(&id.value()).cloned())
    }

    async fn submit_response(&self, response: ProductResponse) -> Result<(), ServiceError> {
        self.take_failure()?;
        let mut catalog = self.catalog.write().await;
        if !catalog.requests.contains_key(&response.request_id.value()) {
            return Err(ServiceError::not_found(
                "product request",
                response.request_id.value(),
            ));
        }
        catalog.responses.push(response);
        Ok(())
    }
}

#[async_trait]
impl FlashDealService for InMemoryMarketplace {
    async fn create(
        &self,
        owner: &UserIdentifier,
        deal: NewFlashDeal,
    ) -> Result<FlashDeal, ServiceError> {
        self.take_failure()?;
        let ends_at =
            Timestamp::from_datetime(Utc::now() + Duration::hours(i64::from(deal.duration_hours)));
        let created = FlashDeal {
            id: FlashDealId::new(self.allocate_id()),
            owner: owner.clone(),
            title: deal.title,
            discount_percent: deal.discount_percent,
            quantity: deal.quantity,
            ends_at,
        };
        self.catalog.write().await.flash_deals.push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn owner() -> UserIdentifier {
        UserIdentifier::new("628")
    }

    fn new_agreement() -> NewAgreement {
        NewAgreement {
            title: "Rice".to_string(),
            counterparty_phone: "62811122233".to_string(),
            amount_cents: 10_000,
            due_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn created_agreements_are_listed_for_owner_only() {
        let market = InMemoryMarketplace::new();
        AgreementService::create(&market, &owner(), new_agreement())
            .await
            .unwrap();

        let mine = AgreementService::list_for(&market, &owner()).await.unwrap();
        let theirs = AgreementService::list_for(&market, &UserIdentifier::new("629"))
            .await
            .unwrap();

        assert_eq!(mine.len(), 1);
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn generated_ids_skip_inserted_ones() {
        let market = InMemoryMarketplace::new();
        market
            .insert_product_request(ProductRequest {
                id: ProductRequestId::new(40),
                product_name: "Oil".to_string(),
                buyer_note: None,
            })
            .await;

        let created = AgreementService::create(&market, &owner(), new_agreement())
            .await
            .unwrap();

        assert_eq!(created.id.value(), 41);
    }

    #[tokio::test]
    async fn injected_failure_hits_next_call_only() {
        let market = InMemoryMarketplace::new();
        market.fail_next(ServiceError::Unavailable("maintenance".to_string()));

        assert!(AgreementService::create(&market, &owner(), new_agreement())
            .await
            .is_err());
        assert!(AgreementService::create(&market, &owner(), new_agreement())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn completing_twice_is_rejected() {
        let market = InMemoryMarketplace::new();
        let created = AgreementService::create(&market, &owner(), new_agreement())
            .await
            .unwrap();

        market.mark_complete(&owner(), created.id).await.unwrap();
        let err = market.mark_complete(&owner(), created.id).await.unwrap_err();

        assert!(matches!(err, ServiceError::Rejected(_)));
    }

    #[tokio::test]
    async fn responded_requests_are_no_longer_open() {
        let market = InMemoryMarketplace::new();
        market.seed_demo(&owner()).await;
        let open = market.list_open(&owner()).await.unwrap();
        let first = open[0].id;

        market
            .submit_response(ProductResponse {
                request_id: first,
                seller: owner(),
                price_cents: 5_000,
                photo_media_id: None,
                latitude: -6.2,
                longitude: 106.8,
            })
            .await
            .unwrap();

        let still_open = market.list_open(&owner()).await.unwrap();
        assert_eq!(still_open.len(), open.len() - 1);
        assert!(!still_open.iter().any(|r| r.id == first));
    }

    #[tokio::test]
    async fn flash_deal_ends_after_duration() {
        let market = InMemoryMarketplace::new();
        let deal = FlashDealService::create(
            &market,
            &owner(),
            NewFlashDeal {
                title: "Mangoes".to_string(),
                discount_percent: 20,
                quantity: 10,
                duration_hours: 2,
            },
        )
        .await
        .unwrap();

        let remaining = deal.ends_at.duration_since(&Timestamp::now());
        assert!(remaining.num_minutes() > 110);
    }
}
