//! Conversational flows of the marketplace bot.
//!
//! One handler per [`FlowName`]. Handlers are stateless and share the
//! marketplace services through [`MarketplaceServices`].

mod agreement_create;
mod agreement_list;
mod flash_deal_create;
mod main_menu;
mod offer_manage;
mod product_respond;

pub use agreement_create::{AgreementCreateData, AgreementCreateHandler};
pub use agreement_list::{AgreementListData, AgreementListHandler};
pub use flash_deal_create::{FlashDealCreateData, FlashDealCreateHandler};
pub use main_menu::MainMenuHandler;
pub use offer_manage::{OfferManageData, OfferManageHandler};
pub use product_respond::{ProductRespondData, ProductRespondHandler};

use std::sync::Arc;

use chrono::NaiveDate;

use crate::application::engine::FlowRegistry;
#[cfg(test)]
use crate::application::engine::{FlowContext, FlowHandler};
use crate::domain::conversation::validation::require_text;
use crate::domain::conversation::{
    Expected, FlowName, IncomingEvent, InvalidInput, BACK_ID, MENU_ID,
};
use crate::domain::foundation::{Timestamp, ValidationError};
use crate::ports::{
    AgreementService, Button, FlashDealService, OfferService, ProductRequestService,
};

/// Selection id confirming a terminal step.
pub const CONFIRM_YES_ID: &str = "confirm_yes";
/// Selection id declining a terminal step.
pub const CONFIRM_NO_ID: &str = "confirm_no";

/// Marketplace collaborators shared by the flow handlers.
#[derive(Clone)]
pub struct MarketplaceServices {
    pub agreements: Arc<dyn AgreementService>,
    pub offers: Arc<dyn OfferService>,
    pub product_requests: Arc<dyn ProductRequestService>,
    pub flash_deals: Arc<dyn FlashDealService>,
}

impl MarketplaceServices {
    /// Uses one backend for every service.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AgreementService + OfferService + ProductRequestService + FlashDealService + 'static,
    {
        Self {
            agreements: backend.clone(),
            offers: backend.clone(),
            product_requests: backend.clone(),
            flash_deals: backend,
        }
    }
}

/// Registry with every marketplace flow registered.
pub fn default_registry(services: &MarketplaceServices) -> FlowRegistry {
    FlowRegistry::new(Arc::new(MainMenuHandler::new()))
        .register(Arc::new(AgreementListHandler::new(
            services.agreements.clone(),
        )))
        .register(Arc::new(AgreementCreateHandler::new(
            services.agreements.clone(),
        )))
        .register(Arc::new(OfferManageHandler::new(services.offers.clone())))
        .register(Arc::new(ProductRespondHandler::new(
            services.product_requests.clone(),
        )))
        .register(Arc::new(FlashDealCreateHandler::new(
            services.flash_deals.clone(),
        )))
}

/// Yes / no buttons for a confirmation step.
pub(crate) fn confirm_buttons() -> Vec<Button> {
    vec![
        Button::new(CONFIRM_YES_ID, "Confirm"),
        Button::new(CONFIRM_NO_ID, "Cancel"),
    ]
}

pub(crate) fn menu_button() -> Button {
    Button::new(MENU_ID, "Main menu")
}

pub(crate) fn back_button() -> Button {
    Button::new(BACK_ID, "Back")
}

/// Reads a confirmation answer, pressed or typed.
pub(crate) fn read_confirmation(event: &IncomingEvent) -> Result<bool, InvalidInput> {
    if let Some(id) = event.selection_id() {
        return match id {
            CONFIRM_YES_ID => Ok(true),
            CONFIRM_NO_ID => Ok(false),
            other => Err(InvalidInput::UnknownSelection(other.to_string())),
        };
    }

    match event.text_content().map(|t| t.trim().to_ascii_lowercase()) {
        Some(text) if matches!(text.as_str(), "yes" | "y" | "confirm") => Ok(true),
        Some(text) if matches!(text.as_str(), "no" | "n") => Ok(false),
        Some(text) => Err(InvalidInput::UnknownSelection(text)),
        None => Err(InvalidInput::WrongKind {
            expected: Expected::Selection,
            got: event.kind(),
        }),
    }
}

/// Requires a text answer and parses it.
pub(crate) fn text_answer<T>(
    event: &IncomingEvent,
    parse: impl FnOnce(&str) -> Result<T, ValidationError>,
) -> Result<T, InvalidInput> {
    let text = require_text(event)?;
    Ok(parse(text)?)
}

pub(crate) fn today() -> NaiveDate {
    Timestamp::now().date()
}

/// Flows offered by the main menu, in display order.
pub(crate) const MENU_ENTRIES: &[(FlowName, &str, &str)] = &[
    (
        FlowName::AgreementList,
        "My agreements",
        "View and complete your agreements",
    ),
    (
        FlowName::AgreementCreate,
        "New agreement",
        "Record a deal with a buyer",
    ),
    (
        FlowName::OfferManage,
        "My offers",
        "Change prices or remove offers",
    ),
    (
        FlowName::ProductRespond,
        "Buyer requests",
        "Quote on what buyers are looking for",
    ),
    (
        FlowName::FlashDealCreate,
        "Flash deal",
        "Publish a time-limited discount",
    ),
];

/// Runs `start` twice from `session` and checks the second run changes
/// nothing: same position and data, same prompts, no marketplace writes.
#[cfg(test)]
pub(crate) async fn assert_start_is_idempotent(
    handler: &dyn FlowHandler,
    market: &crate::adapters::InMemoryMarketplace,
    mut session: crate::domain::conversation::ConversationSession,
) {
    use crate::adapters::RecordingMessenger;

    let messenger = RecordingMessenger::new();
    let catalog = market.catalog_snapshot().await;

    let first_handoff = {
        let mut ctx = FlowContext::new(&mut session, &messenger);
        handler.start(&mut ctx).await.unwrap();
        ctx.take_handoff()
    };
    let after_first = session.clone();
    let first_prompts = messenger.sent();
    messenger.clear();

    let second_handoff = {
        let mut ctx = FlowContext::new(&mut session, &messenger);
        handler.start(&mut ctx).await.unwrap();
        ctx.take_handoff()
    };

    assert_eq!(session.current_flow(), Some(handler.name()));
    assert_eq!(session.current_flow(), after_first.current_flow());
    assert_eq!(session.current_step(), after_first.current_step());
    assert_eq!(session, after_first);
    assert_eq!(second_handoff, first_handoff);
    assert!(!first_prompts.is_empty());
    assert_eq!(messenger.sent(), first_prompts);
    assert_eq!(market.catalog_snapshot().await, catalog);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::EventKind;

    #[test]
    fn confirmation_accepts_buttons_and_words() {
        assert_eq!(
            read_confirmation(&IncomingEvent::button_reply("628", CONFIRM_YES_ID, "Confirm")),
            Ok(true)
        );
        assert_eq!(read_confirmation(&IncomingEvent::text("628", " No ")), Ok(false));
    }

    #[test]
    fn confirmation_rejects_other_input() {
        assert!(matches!(
            read_confirmation(&IncomingEvent::text("628", "maybe")),
            Err(InvalidInput::UnknownSelection(_))
        ));
        assert_eq!(
            read_confirmation(&IncomingEvent::image("628", "media-1")),
            Err(InvalidInput::WrongKind {
                expected: Expected::Selection,
                got: EventKind::Image,
            })
        );
    }

    #[test]
    fn menu_never_offers_itself() {
        assert!(MENU_ENTRIES
            .iter()
            .all(|(flow, _, _)| *flow != FlowName::MainMenu));
    }
}
