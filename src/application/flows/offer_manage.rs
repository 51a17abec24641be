//! OfferManage flow - change the price of an offer or delete it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::engine::{FlowContext, FlowError, FlowHandler, StepOutcome};
use crate::domain::conversation::validation::{parse_amount_cents, require_selection};
use crate::domain::conversation::{
    entity_selection_id, has_selection_prefix, parse_entity_selection, FlowData, FlowDescriptor,
    FlowStep, IncomingEvent, InvalidInput, OfferManageStep, OFFER_MANAGE,
};
use crate::domain::foundation::OfferId;
use crate::domain::marketplace::format_amount;
use crate::ports::{Button, ListRow, ListSection, OfferService};

use super::{back_button, confirm_buttons, menu_button, read_confirmation, text_answer};

/// Selection prefix of offer rows.
pub const OFFER_PREFIX: &str = "offer";
/// Selection id that asks for a new price.
pub const EDIT_PRICE_ID: &str = "edit_price";
/// Selection id that asks to delete the offer.
pub const DELETE_ID: &str = "delete";

const MAX_LISTED: usize = 10;

/// Temp data of the offer management flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferManageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_title: Option<String>,
}

impl FlowData for OfferManageData {}

impl OfferManageData {
    fn title(&self) -> &str {
        self.offer_title.as_deref().unwrap_or("this offer")
    }
}

pub struct OfferManageHandler {
    offers: Arc<dyn OfferService>,
}

impl OfferManageHandler {
    pub fn new(offers: Arc<dyn OfferService>) -> Self {
        Self { offers }
    }

    /// The offer under management. Without one the flow restarts.
    async fn selected_offer(&self, ctx: &mut FlowContext<'_>) -> Result<Option<OfferId>, FlowError> {
        match ctx.data::<OfferManageData>().offer_id {
            Some(id) => Ok(Some(OfferId::new(id))),
            None => {
                tracing::debug!(user = %ctx.user(), "No offer selected; restarting offer flow");
                ctx.send_text("Please pick the offer again.").await?;
                self.start(ctx).await?;
                Ok(None)
            }
        }
    }

    async fn show_offers(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let offers = self.offers.list_for(ctx.user()).await?;
        if offers.is_empty() {
            ctx.send_buttons("You have no published offers.", vec![menu_button()])
                .await?;
            return Ok(());
        }

        let rows = offers
            .iter()
            .take(MAX_LISTED)
            .map(|offer| {
                ListRow::new(entity_selection_id(OFFER_PREFIX, offer.id.value()), &offer.title)
                    .with_description(format!(
                        "{} · {} in stock",
                        format_amount(offer.price_cents),
                        offer.stock
                    ))
            })
            .collect();
        ctx.send_list(
            "Your offers. Pick one to manage it.",
            "Offers",
            vec![ListSection::new("Offers", rows)],
        )
        .await?;
        Ok(())
    }

    async fn choose_offer(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let selection = match require_selection(event) {
            Ok(selection) => selection,
            Err(invalid) => return Ok(invalid.into()),
        };

        let Some(id) = parse_entity_selection(selection, OFFER_PREFIX) else {
            if has_selection_prefix(selection, OFFER_PREFIX) {
                self.start(ctx).await?;
                return Ok(StepOutcome::Advanced);
            }
            return Ok(InvalidInput::UnknownSelection(selection.to_string()).into());
        };

        match self.offers.get(ctx.user(), OfferId::new(id)).await? {
            Some(offer) => {
                ctx.store(&OfferManageData {
                    offer_id: Some(offer.id.value()),
                    offer_title: Some(offer.title),
                })?;
                ctx.set_step(OfferManageStep::ManageOffer)?;
                self.prompt_step(ctx).await?;
            }
            None => {
                ctx.send_text("That offer is no longer available.").await?;
                self.start(ctx).await?;
            }
        }
        Ok(StepOutcome::Advanced)
    }
}

#[async_trait]
impl FlowHandler for OfferManageHandler {
    fn descriptor(&self) -> &'static FlowDescriptor {
        &OFFER_MANAGE
    }

    fn previous_step(&self, step: &str) -> Option<&'static str> {
        match OfferManageStep::parse(step)? {
            OfferManageStep::MyOffers => None,
            OfferManageStep::ManageOffer => Some(OfferManageStep::MyOffers.as_str()),
            OfferManageStep::EditPrice | OfferManageStep::DeleteConfirm => {
                Some(OfferManageStep::ManageOffer.as_str())
            }
        }
    }

    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.clear_data();
        ctx.set_step(OfferManageStep::MyOffers)?;
        self.show_offers(ctx).await
    }

    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let Some(step) = ctx.step::<OfferManageStep>() else {
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        match step {
            OfferManageStep::MyOffers => self.choose_offer(ctx, event).await,

            OfferManageStep::ManageOffer => {
                let selection = match require_selection(event) {
                    Ok(selection) => selection,
                    Err(invalid) => return Ok(invalid.into()),
                };
                let next = match selection {
                    EDIT_PRICE_ID => OfferManageStep::EditPrice,
                    DELETE_ID => OfferManageStep::DeleteConfirm,
                    other => return Ok(InvalidInput::UnknownSelection(other.to_string()).into()),
                };
                ctx.set_step(next)?;
                self.prompt_step(ctx).await?;
                Ok(StepOutcome::Advanced)
            }

            OfferManageStep::EditPrice => {
                let price_cents = match text_answer(event, |text| parse_amount_cents("price", text)) {
                    Ok(price_cents) => price_cents,
                    Err(invalid) => return Ok(invalid.into()),
                };
                let Some(id) = self.selected_offer(ctx).await? else {
                    return Ok(StepOutcome::Advanced);
                };

                let offer = self.offers.update_price(ctx.user(), id, price_cents).await?;
                tracing::info!(user = %ctx.user(), offer_id = %offer.id, price_cents, "Offer price updated");
                ctx.store(&OfferManageData {
                    offer_id: Some(offer.id.value()),
                    offer_title: Some(offer.title.clone()),
                })?;
                ctx.set_step(OfferManageStep::ManageOffer)?;
                ctx.commit();

                ctx.send_text(&format!(
                    "The price of \"{}\" is now {}.",
                    offer.title,
                    format_amount(offer.price_cents)
                ))
                .await?;
                self.prompt_step(ctx).await?;
                Ok(StepOutcome::Advanced)
            }

            OfferManageStep::DeleteConfirm => {
                let confirmed = match read_confirmation(event) {
                    Ok(confirmed) => confirmed,
                    Err(invalid) => return Ok(invalid.into()),
                };
                if !confirmed {
                    ctx.set_step(OfferManageStep::ManageOffer)?;
                    self.prompt_step(ctx).await?;
                    return Ok(StepOutcome::Advanced);
                }
                let Some(id) = self.selected_offer(ctx).await? else {
                    return Ok(StepOutcome::Advanced);
                };

                self.offers.delete(ctx.user(), id).await?;
                tracing::info!(user = %ctx.user(), offer_id = %id, "Offer deleted");

                let title = ctx.data::<OfferManageData>().title().to_string();
                ctx.clear_data();
                ctx.set_step(OfferManageStep::MyOffers)?;
                ctx.commit();

                ctx.send_text(&format!("\"{}\" was deleted.", title)).await?;
                self.prompt_step(ctx).await?;
                Ok(StepOutcome::Advanced)
            }
        }
    }

    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let data = ctx.data::<OfferManageData>();
        match ctx.step::<OfferManageStep>() {
            Some(OfferManageStep::MyOffers) | None => self.show_offers(ctx).await,
            Some(OfferManageStep::ManageOffer) => {
                ctx.send_buttons(
                    &format!("What would you like to do with \"{}\"?", data.title()),
                    vec![
                        Button::new(EDIT_PRICE_ID, "Change price"),
                        Button::new(DELETE_ID, "Delete"),
                        back_button(),
                    ],
                )
                .await?;
                Ok(())
            }
            Some(OfferManageStep::EditPrice) => {
                ctx.send_text(&format!("Send the new price for \"{}\".", data.title()))
                    .await?;
                Ok(())
            }
            Some(OfferManageStep::DeleteConfirm) => {
                ctx.send_buttons(
                    &format!("Delete \"{}\"? This can't be undone.", data.title()),
                    confirm_buttons(),
                )
                .await?;
                Ok(())
            }
        }
    }
}
