//! FlashDealCreate flow - publish a time-limited discount.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::engine::{FlowContext, FlowError, FlowHandler, StepOutcome};
use crate::domain::conversation::validation::{parse_bounded, parse_title};
use crate::domain::conversation::{
    FlashDealCreateStep, FlowData, FlowDescriptor, FlowStep, IncomingEvent, InvalidInput,
    FLASH_DEAL_CREATE,
};
use crate::domain::marketplace::NewFlashDeal;
use crate::ports::FlashDealService;

use super::{confirm_buttons, read_confirmation, text_answer};

const MIN_DISCOUNT: i64 = 1;
const MAX_DISCOUNT: i64 = 99;
const MAX_QUANTITY: i64 = 10_000;
/// One week.
const MAX_DURATION_HOURS: i64 = 168;

/// Temp data of the flash deal draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashDealCreateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<u32>,
}

impl FlowData for FlashDealCreateData {}

impl FlashDealCreateData {
    fn to_command(&self) -> Option<NewFlashDeal> {
        Some(NewFlashDeal {
            title: self.title.clone()?,
            discount_percent: self.discount_percent?,
            quantity: self.quantity?,
            duration_hours: self.duration_hours?,
        })
    }
}

pub struct FlashDealCreateHandler {
    deals: Arc<dyn FlashDealService>,
}

impl FlashDealCreateHandler {
    pub fn new(deals: Arc<dyn FlashDealService>) -> Self {
        Self { deals }
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
            ctx.send_text("Okay, the flash deal was discarded.").await?;
            ctx.return_to_menu();
            return Ok(StepOutcome::Advanced);
        }

        let Some(command) = ctx.data::<FlashDealCreateData>().to_command() else {
            tracing::warn!(user = %ctx.user(), "Flash deal draft incomplete at confirm; restarting");
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        let deal = self.deals.create(ctx.user(), command).await?;
        tracing::info!(user = %ctx.user(), deal_id = %deal.id, "Flash deal published");
        ctx.return_to_menu();
        ctx.commit();

        ctx.send_text(&format!(
            "Your flash deal \"{}\" is live: {}% off {} units until {}.",
            deal.title,
            deal.discount_percent,
            deal.quantity,
            deal.ends_at.as_datetime().format("%Y-%m-%d %H:%M UTC")
        ))
        .await?;
        Ok(StepOutcome::Advanced)
    }
}

#[async_trait]
impl FlowHandler for FlashDealCreateHandler {
    fn descriptor(&self) -> &'static FlowDescriptor {
        &FLASH_DEAL_CREATE
    }

    fn previous_step(&self, step: &str) -> Option<&'static str> {
        let step = FlashDealCreateStep::parse(step)?;
        let position = FlashDealCreateStep::ALL.iter().position(|s| *s == step)?;
        position
            .checked_sub(1)
            .map(|previous| FlashDealCreateStep::ALL[previous].as_str())
    }

    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.clear_data();
        ctx.set_step(FlashDealCreateStep::AskTitle)?;
        self.prompt_step(ctx).await
    }

    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let Some(step) = ctx.step::<FlashDealCreateStep>() else {
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        let mut data = ctx.data::<FlashDealCreateData>();
        let parsed: Result<FlashDealCreateStep, InvalidInput> = match step {
            FlashDealCreateStep::Confirm => return self.confirm(ctx, event).await,
            FlashDealCreateStep::AskTitle => {
                text_answer(event, |text| parse_title("title", text, 3, 60)).map(|title| {
                    data.title = Some(title);
                    FlashDealCreateStep::AskDiscount
                })
            }
            FlashDealCreateStep::AskDiscount => text_answer(event, |text| {
                parse_bounded("discount", text, MIN_DISCOUNT, MAX_DISCOUNT)
            })
            .map(|discount| {
                data.discount_percent = u8::try_from(discount).ok();
                FlashDealCreateStep::AskQuantity
            }),
            FlashDealCreateStep::AskQuantity => {
                text_answer(event, |text| parse_bounded("quantity", text, 1, MAX_QUANTITY)).map(
                    |quantity| {
                        data.quantity = u32::try_from(quantity).ok();
                        FlashDealCreateStep::AskDuration
                    },
                )
            }
            FlashDealCreateStep::AskDuration => text_answer(event, |text| {
                parse_bounded("duration", text, 1, MAX_DURATION_HOURS)
            })
            .map(|hours| {
                data.duration_hours = u32::try_from(hours).ok();
                FlashDealCreateStep::Confirm
            }),
        };

        match parsed {
            Ok(next) => {
                ctx.store(&data)?;
                ctx.set_step(next)?;
                self.prompt_step(ctx).await?;
                Ok(StepOutcome::Advanced)
            }
            Err(invalid) => Ok(invalid.into()),
        }
    }

    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let Some(step) = ctx.step::<FlashDealCreateStep>() else {
            return Ok(());
        };
        match step {
            FlashDealCreateStep::AskTitle => {
                ctx.send_text("What product is the flash deal for?").await?;
            }
            FlashDealCreateStep::AskDiscount => {
                ctx.send_text(&format!(
                    "How much discount? Send a percentage from {} to {}.",
                    MIN_DISCOUNT, MAX_DISCOUNT
                ))
                .await?;
            }
            FlashDealCreateStep::AskQuantity => {
                ctx.send_text("How many units are available at this price?")
                    .await?;
            }
            FlashDealCreateStep::AskDuration => {
                ctx.send_text(&format!(
                    "How many hours should the deal run? Up to {}.",
                    MAX_DURATION_HOURS
                ))
                .await?;
            }
            FlashDealCreateStep::Confirm => {
                let data = ctx.data::<FlashDealCreateData>();
                let summary = format!(
                    "Publish this flash deal?\nProduct: {}\nDiscount: {}%\nQuantity: {}\nDuration: {}h",
                    data.title.as_deref().unwrap_or("-"),
                    data.discount_percent.unwrap_or_default(),
                    data.quantity.unwrap_or_default(),
                    data.duration_hours.unwrap_or_default(),
                );
                ctx.send_buttons(&summary, confirm_buttons()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryMarketplace, RecordingMessenger};
    use crate::domain::conversation::{ConversationSession, FlowName, TempData};
    use crate::domain::foundation::UserIdentifier;
    use crate::ports::OutboundMessage;

    fn session_at(step: FlashDealCreateStep, data: &FlashDealCreateData) -> ConversationSession {
        ConversationSession::restore(
            UserIdentifier::new("628"),
            Some(FlowName::FlashDealCreate),
            Some(step.as_str().to_string()),
            data.to_bag().unwrap_or_else(|_| TempData::new()),
        )
    }

    #[tokio::test]
    async fn non_numeric_discount_is_invalid() {
        let handler = FlashDealCreateHandler::new(Arc::new(InMemoryMarketplace::new()));
        let messenger = RecordingMessenger::new();
        let data = FlashDealCreateData {
            title: Some("Mangoes".to_string()),
            ..Default::default()
        };
        let mut session = session_at(FlashDealCreateStep::AskDiscount, &data);
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let outcome = handler
            .handle(&mut ctx, &IncomingEvent::text("628", "abc"))
            .await
            .unwrap();

        assert!(matches!(outcome, StepOutcome::Invalid(InvalidInput::Field(_))));
        assert_eq!(ctx.step::<FlashDealCreateStep>(), Some(FlashDealCreateStep::AskDiscount));
        assert_eq!(ctx.data::<FlashDealCreateData>(), data);
    }

    #[tokio::test]
    async fn discount_out_of_range_is_invalid() {
        let handler = FlashDealCreateHandler::new(Arc::new(InMemoryMarketplace::new()));
        let messenger = RecordingMessenger::new();
        let mut session = session_at(FlashDealCreateStep::AskDiscount, &FlashDealCreateData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let outcome = handler
            .handle(&mut ctx, &IncomingEvent::text("628", "100"))
            .await
            .unwrap();

        assert!(matches!(outcome, StepOutcome::Invalid(_)));
    }

    #[tokio::test]
    async fn default_invalid_handling_reprompts_same_step() {
        let handler = FlashDealCreateHandler::new(Arc::new(InMemoryMarketplace::new()));
        let messenger = RecordingMessenger::new();
        let mut session = session_at(FlashDealCreateStep::AskDiscount, &FlashDealCreateData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);
        let invalid = InvalidInput::from(crate::domain::foundation::ValidationError::out_of_range(
            "discount", 1, 99, 150,
        ));

        handler.handle_invalid_input(&mut ctx, &invalid).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].message.body().unwrap_or_default().contains("between 1 and 99"));
        match &sent[1].message {
            OutboundMessage::Text { body } => assert!(body.contains("percentage")),
            other => panic!("expected text prompt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn percent_sign_is_accepted() {
        let handler = FlashDealCreateHandler::new(Arc::new(InMemoryMarketplace::new()));
        let messenger = RecordingMessenger::new();
        let mut session = session_at(FlashDealCreateStep::AskDiscount, &FlashDealCreateData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::text("628", "25%"))
            .await
            .unwrap();

        assert_eq!(ctx.data::<FlashDealCreateData>().discount_percent, Some(25));
        assert_eq!(ctx.step::<FlashDealCreateStep>(), Some(FlashDealCreateStep::AskQuantity));
    }

    #[tokio::test]
    async fn confirm_publishes_and_returns_to_menu() {
        let market = Arc::new(InMemoryMarketplace::new());
        let handler = FlashDealCreateHandler::new(market.clone());
        let messenger = RecordingMessenger::new();
        let data = FlashDealCreateData {
            title: Some("Mangoes".to_string()),
            discount_percent: Some(30),
            quantity: Some(50),
            duration_hours: Some(12),
        };
        let mut session = session_at(FlashDealCreateStep::Confirm, &data);
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::button_reply("628", "confirm_yes", "Confirm"))
            .await
            .unwrap();

        assert_eq!(market.flash_deals().await.len(), 1);
        assert_eq!(ctx.session().current_flow(), Some(FlowName::MainMenu));
    }

    #[tokio::test]
    async fn start_twice_discards_the_draft_without_publishing() {
        let market = Arc::new(InMemoryMarketplace::new());
        let draft = FlashDealCreateData {
            title: Some("Mangoes".to_string()),
            discount_percent: Some(20),
            quantity: Some(50),
            duration_hours: Some(24),
        };
        let session = session_at(FlashDealCreateStep::Confirm, &draft);

        crate::application::flows::assert_start_is_idempotent(
            &FlashDealCreateHandler::new(market.clone()),
            &market,
            session,
        )
        .await;
        assert!(market.flash_deals().await.is_empty());
    }
}
