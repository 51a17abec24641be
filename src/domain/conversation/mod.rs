//! Conversation module - flow/step state machine vocabulary.
//!
//! # Module Organization
//!
//! - `flow` - Flow names, typed step enums and static descriptors
//! - `session` - Per-user session aggregate (flow, step, temp data)
//! - `event` - Normalized inbound events and their total accessors
//! - `temp_data` - Typed per-flow views over the generic temp-data bag
//! - `navigation` - Global navigation commands and selection-id parsing
//! - `validation` - Step input validation (`InvalidInput`)

mod errors;
mod event;
mod flow;
pub mod macros;
mod navigation;
mod session;
mod temp_data;
pub mod validation;

pub use errors::{TempDataError, TransitionError};
pub use event::{EventKind, EventPayload, IncomingEvent};
pub use flow::{
    AgreementCreateStep, AgreementListStep, FlashDealCreateStep, FlowDescriptor, FlowName,
    FlowStep, MainMenuStep, OfferManageStep, ProductRespondStep, UnknownFlow, AGREEMENT_CREATE,
    AGREEMENT_LIST, FLASH_DEAL_CREATE, MAIN_MENU, OFFER_MANAGE, PRODUCT_RESPOND,
};
pub use navigation::{
    entity_selection_id, has_selection_prefix, parse_entity_selection, NavigationCommand, BACK_ID,
    CANCEL_ID, MENU_ID, RETRY_ID,
};
pub use session::ConversationSession;
pub use temp_data::{FlowData, TempData};
pub use validation::{Expected, InvalidInput};
