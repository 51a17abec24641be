//! ProductRespond flow - quote on a buyer's product request.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::engine::{FlowContext, FlowError, FlowHandler, StepOutcome};
use crate::domain::conversation::validation::{
    parse_amount_cents, require_image, require_location, require_selection,
};
use crate::domain::conversation::{
    entity_selection_id, has_selection_prefix, parse_entity_selection, EventKind, Expected,
    FlowData, FlowDescriptor, FlowStep, IncomingEvent, InvalidInput, ProductRespondStep,
    PRODUCT_RESPOND,
};
use crate::domain::foundation::ProductRequestId;
use crate::domain::marketplace::{format_amount, ProductResponse};
use crate::ports::{Button, ListRow, ListSection, ProductRequestService};

use super::{confirm_buttons, menu_button, read_confirmation, text_answer};

/// Selection prefix of product request rows.
pub const REQUEST_PREFIX: &str = "request";
/// Selection id that answers the photo step without a photo.
pub const SKIP_PHOTO_ID: &str = "skip_photo";

const MAX_LISTED: usize = 10;

/// Temp data of a response in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRespondData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl FlowData for ProductRespondData {}

impl ProductRespondData {
    fn product(&self) -> &str {
        self.product_name.as_deref().unwrap_or("the requested product")
    }
}

pub struct ProductRespondHandler {
    requests: Arc<dyn ProductRequestService>,
}

impl ProductRespondHandler {
    pub fn new(requests: Arc<dyn ProductRequestService>) -> Self {
        Self { requests }
    }

    async fn advance(
        &self,
        ctx: &mut FlowContext<'_>,
        data: &ProductRespondData,
        next: ProductRespondStep,
    ) -> Result<StepOutcome, FlowError> {
        ctx.store(data)?;
        ctx.set_step(next)?;
        self.prompt_step(ctx).await?;
        Ok(StepOutcome::Advanced)
    }

    async fn show_requests(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let requests = self.requests.list_open(ctx.user()).await?;
        if requests.is_empty() {
            ctx.send_buttons(
                "There are no open buyer requests right now.",
                vec![menu_button()],
            )
            .await?;
            return Ok(());
        }

        let rows = requests
            .iter()
            .take(MAX_LISTED)
            .map(|request| {
                let row = ListRow::new(
                    entity_selection_id(REQUEST_PREFIX, request.id.value()),
                    &request.product_name,
                );
                match &request.buyer_note {
                    Some(note) => row.with_description(note),
                    None => row,
                }
            })
            .collect();
        ctx.send_list(
            "Buyers are looking for these products. Pick one to send a quote.",
            "Requests",
            vec![ListSection::new("Open requests", rows)],
        )
        .await?;
        Ok(())
    }

    async fn choose_request(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let selection = match require_selection(event) {
            Ok(selection) => selection,
            Err(invalid) => return Ok(invalid.into()),
        };

        let Some(id) = parse_entity_selection(selection, REQUEST_PREFIX) else {
            if has_selection_prefix(selection, REQUEST_PREFIX) {
                self.start(ctx).await?;
                return Ok(StepOutcome::Advanced);
            }
            return Ok(InvalidInput::UnknownSelection(selection.to_string()).into());
        };

        match self.requests.get(ProductRequestId::new(id)).await? {
            Some(request) => {
                let data = ProductRespondData {
                    request_id: Some(request.id.value()),
                    product_name: Some(request.product_name),
                    ..Default::default()
                };
                self.advance(ctx, &data, ProductRespondStep::AskPrice).await
            }
            None => {
                ctx.send_text("That request has already been closed.").await?;
                self.start(ctx).await?;
                Ok(StepOutcome::Advanced)
            }
        }
    }

    async fn confirm(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let confirmed = match read_confirmation(event) {
            Ok(confirmed) => confirmed,
            Err(invalid) => return Ok(invalid.into()),
        };
        if !confirmed {
            ctx.send_text("Okay, your quote was not sent.").await?;
            ctx.return_to_menu();
            return Ok(StepOutcome::Advanced);
        }

        let data = ctx.data::<ProductRespondData>();
        let (Some(request_id), Some(price_cents), Some(latitude), Some(longitude)) =
            (data.request_id, data.price_cents, data.latitude, data.longitude)
        else {
            tracing::warn!(user = %ctx.user(), "Product response incomplete at confirm; restarting");
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        let response = ProductResponse {
            request_id: ProductRequestId::new(request_id),
            seller: ctx.user().clone(),
            price_cents,
            photo_media_id: data.photo_media_id.clone(),
            latitude,
            longitude,
        };
        self.requests.submit_response(response).await?;
        tracing::info!(user = %ctx.user(), request_id, "Product response submitted");
        ctx.return_to_menu();
        ctx.commit();

        ctx.send_text(&format!(
            "Your quote for {} was sent to the buyer.",
            data.product()
        ))
        .await?;
        Ok(StepOutcome::Advanced)
    }
}

#[async_trait]
impl FlowHandler for ProductRespondHandler {
    fn descriptor(&self) -> &'static FlowDescriptor {
        &PRODUCT_RESPOND
    }

    fn previous_step(&self, step: &str) -> Option<&'static str> {
        let step = ProductRespondStep::parse(step)?;
        let position = ProductRespondStep::ALL.iter().position(|s| *s == step)?;
        position
            .checked_sub(1)
            .map(|previous| ProductRespondStep::ALL[previous].as_str())
    }

    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.clear_data();
        ctx.set_step(ProductRespondStep::ChooseRequest)?;
        self.show_requests(ctx).await
    }

    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let Some(step) = ctx.step::<ProductRespondStep>() else {
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };
        let mut data = ctx.data::<ProductRespondData>();

        match step {
            ProductRespondStep::ChooseRequest => self.choose_request(ctx, event).await,

            ProductRespondStep::AskPrice => {
                match text_answer(event, |text| parse_amount_cents("price", text)) {
                    Ok(price_cents) => {
                        data.price_cents = Some(price_cents);
                        self.advance(ctx, &data, ProductRespondStep::AskPhoto).await
                    }
                    Err(invalid) => Ok(invalid.into()),
                }
            }

            ProductRespondStep::AskPhoto => {
                if event.selection_id() == Some(SKIP_PHOTO_ID) {
                    data.photo_media_id = None;
                    return self.advance(ctx, &data, ProductRespondStep::AskLocation).await;
                }
                match require_image(event) {
                    Ok(media_id) => {
                        data.photo_media_id = Some(media_id.to_string());
                        self.advance(ctx, &data, ProductRespondStep::AskLocation).await
                    }
                    Err(invalid) => Ok(invalid.into()),
                }
            }

            ProductRespondStep::AskLocation => match require_location(event) {
                Ok((latitude, longitude)) => {
                    data.latitude = Some(latitude);
                    data.longitude = Some(longitude);
                    self.advance(ctx, &data, ProductRespondStep::Confirm).await
                }
                Err(invalid) => Ok(invalid.into()),
            },

            ProductRespondStep::Confirm => self.confirm(ctx, event).await,
        }
    }

    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let data = ctx.data::<ProductRespondData>();
        match ctx.step::<ProductRespondStep>() {
            Some(ProductRespondStep::ChooseRequest) | None => return self.show_requests(ctx).await,
            Some(ProductRespondStep::AskPrice) => {
                ctx.send_text(&format!("What is your price for {}?", data.product()))
                    .await?;
            }
            Some(ProductRespondStep::AskPhoto) => {
                ctx.send_buttons(
                    "Send a photo of the product, or skip this step.",
                    vec![Button::new(SKIP_PHOTO_ID, "Skip photo")],
                )
                .await?;
            }
            Some(ProductRespondStep::AskLocation) => {
                ctx.request_location("Share the pickup location for the product.")
                    .await?;
            }
            Some(ProductRespondStep::Confirm) => {
                let summary = format!(
                    "Send this quote?\nProduct: {}\nPrice: {}\nPhoto: {}",
                    data.product(),
                    data.price_cents
                        .map(format_amount)
                        .unwrap_or_else(|| "-".to_string()),
                    if data.photo_media_id.is_some() { "attached" } else { "none" },
                );
                ctx.send_buttons(&summary, confirm_buttons()).await?;
            }
        }
        Ok(())
    }

    async fn handle_invalid_input(
        &self,
        ctx: &mut FlowContext<'_>,
        invalid: &InvalidInput,
    ) -> Result<(), FlowError> {
        // A typed address instead of a shared pin gets a specific hint.
        if let InvalidInput::WrongKind {
            expected: Expected::Location,
            got: EventKind::Text,
        } = invalid
        {
            ctx.send_text("Please use the attach button to share a location pin.")
                .await?;
            return self.prompt_step(ctx).await;
        }
        ctx.send_text(&invalid.notice()).await?;
        self.prompt_step(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryMarketplace, RecordingMessenger};
    use crate::domain::conversation::{ConversationSession, FlowName, TempData};
    use crate::domain::foundation::UserIdentifier;
    use crate::domain::marketplace::ProductRequest;
    use crate::ports::OutboundMessage;

    fn session_at(step: ProductRespondStep, data: &ProductRespondData) -> ConversationSession {
        ConversationSession::restore(
            UserIdentifier::new("628"),
            Some(FlowName::ProductRespond),
            Some(step.as_str().to_string()),
            data.to_bag().unwrap_or_else(|_| TempData::new()),
        )
    }

    fn quote_in_progress() -> ProductRespondData {
        ProductRespondData {
            request_id: Some(3),
            product_name: Some("Coconut oil".to_string()),
            price_cents: Some(4_500),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn choosing_request_asks_for_price() {
        let market = Arc::new(InMemoryMarketplace::new());
        market
            .insert_product_request(ProductRequest {
                id: ProductRequestId::new(3),
                product_name: "Coconut oil".to_string(),
                buyer_note: Some("5 litres".to_string()),
            })
            .await;
        let handler = ProductRespondHandler::new(market);
        let messenger = RecordingMessenger::new();
        let mut session = session_at(ProductRespondStep::ChooseRequest, &ProductRespondData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::list_reply("628", "request_3", "Coconut oil"))
            .await
            .unwrap();

        assert_eq!(ctx.step::<ProductRespondStep>(), Some(ProductRespondStep::AskPrice));
        assert_eq!(ctx.data::<ProductRespondData>().request_id, Some(3));
    }

    #[tokio::test]
    async fn photo_can_be_skipped() {
        let handler = ProductRespondHandler::new(Arc::new(InMemoryMarketplace::new()));
        let messenger = RecordingMessenger::new();
        let mut session = session_at(ProductRespondStep::AskPhoto, &quote_in_progress());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::button_reply("628", SKIP_PHOTO_ID, "Skip photo"))
            .await
            .unwrap();

        assert_eq!(ctx.step::<ProductRespondStep>(), Some(ProductRespondStep::AskLocation));
        match &messenger.sent()[0].message {
            OutboundMessage::LocationRequest { .. } => {}
            other => panic!("expected location request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn text_at_location_step_is_invalid() {
        let handler = ProductRespondHandler::new(Arc::new(InMemoryMarketplace::new()));
        let messenger = RecordingMessenger::new();
        let mut session = session_at(ProductRespondStep::AskLocation, &quote_in_progress());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let outcome = handler
            .handle(&mut ctx, &IncomingEvent::text("628", "Jalan Sudirman 5"))
            .await
            .unwrap();

        assert!(matches!(outcome, StepOutcome::Invalid(InvalidInput::WrongKind { .. })));
        assert_eq!(ctx.step::<ProductRespondStep>(), Some(ProductRespondStep::AskLocation));
    }

    #[tokio::test]
    async fn confirm_submits_response_and_returns_to_menu() {
        let market = Arc::new(InMemoryMarketplace::new());
        let handler = ProductRespondHandler::new(market.clone());
        let messenger = RecordingMessenger::new();
        let mut data = quote_in_progress();
        data.latitude = Some(-6.2);
        data.longitude = Some(106.8);
        let mut session = session_at(ProductRespondStep::Confirm, &data);
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::button_reply("628", "confirm_yes", "Confirm"))
            .await
            .unwrap();

        let responses = market.responses().await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].price_cents, 4_500);
        assert_eq!(ctx.session().current_flow(), Some(FlowName::MainMenu));
    }

    #[tokio::test]
    async fn start_twice_lists_the_same_requests_without_quoting() {
        let market = Arc::new(InMemoryMarketplace::new());
        market
            .insert_product_request(ProductRequest {
                id: ProductRequestId::new(3),
                product_name: "Coconut oil".to_string(),
                buyer_note: None,
            })
            .await;

        crate::application::flows::assert_start_is_idempotent(
            &ProductRespondHandler::new(market.clone()),
            &market,
            session_at(ProductRespondStep::Confirm, &quote_in_progress()),
        )
        .await;
        assert!(market.responses().await.is_empty());
    }
}
