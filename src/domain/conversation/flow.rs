//! Flow names, step sets and static flow descriptors.
//!
//! Flows are independent finite-state machines. Each one is identified by a
//! [`FlowName`] and declares its closed step set through a step enum generated
//! by `flow_steps!`. Descriptors are plain statics built from those enums, so
//! they are defined once and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::flow_steps;

/// Closed set of conversational flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowName {
    MainMenu,
    AgreementList,
    AgreementCreate,
    OfferManage,
    ProductRespond,
    FlashDealCreate,
}

impl FlowName {
    /// Returns every flow name.
    pub fn all() -> &'static [FlowName] {
        &[
            FlowName::MainMenu,
            FlowName::AgreementList,
            FlowName::AgreementCreate,
            FlowName::OfferManage,
            FlowName::ProductRespond,
            FlowName::FlashDealCreate,
        ]
    }

    /// Returns the persisted name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowName::MainMenu => "main_menu",
            FlowName::AgreementList => "agreement_list",
            FlowName::AgreementCreate => "agreement_create",
            FlowName::OfferManage => "offer_manage",
            FlowName::ProductRespond => "product_respond",
            FlowName::FlashDealCreate => "flash_deal_create",
        }
    }

    /// Returns the static descriptor of this flow.
    pub fn descriptor(&self) -> &'static FlowDescriptor {
        match self {
            FlowName::MainMenu => &MAIN_MENU,
            FlowName::AgreementList => &AGREEMENT_LIST,
            FlowName::AgreementCreate => &AGREEMENT_CREATE,
            FlowName::OfferManage => &OFFER_MANAGE,
            FlowName::ProductRespond => &PRODUCT_RESPOND,
            FlowName::FlashDealCreate => &FLASH_DEAL_CREATE,
        }
    }
}

impl fmt::Display for FlowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown flow name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown flow: {0}")]
pub struct UnknownFlow(pub String);

impl FromStr for FlowName {
    type Err = UnknownFlow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlowName::all()
            .iter()
            .copied()
            .find(|flow| flow.as_str() == s)
            .ok_or_else(|| UnknownFlow(s.to_string()))
    }
}

/// A typed step of one flow.
///
/// Implemented by the enums generated with `flow_steps!`; the enum is the
/// flow's step set, so a handler writing a typed step can never leave it.
pub trait FlowStep: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Flow this step belongs to.
    const FLOW: FlowName;

    /// Persisted step name.
    fn as_str(&self) -> &'static str;

    /// Parses a persisted step name.
    fn parse(step: &str) -> Option<Self>;
}

/// Static description of a flow: name, initial step and step set.
#[derive(Debug, PartialEq, Eq)]
pub struct FlowDescriptor {
    pub name: FlowName,
    pub initial_step: &'static str,
    pub steps: &'static [&'static str],
}

impl FlowDescriptor {
    /// Builds a descriptor whose initial step is the first declared step.
    pub const fn new(name: FlowName, steps: &'static [&'static str]) -> Self {
        Self {
            name,
            initial_step: steps[0],
            steps,
        }
    }

    /// Returns true if `step` belongs to this flow's step set.
    pub fn declares(&self, step: &str) -> bool {
        self.steps.contains(&step)
    }
}

flow_steps! {
    /// Steps of the main menu.
    pub enum MainMenuStep for FlowName::MainMenu {
        AwaitingSelection => "awaiting_selection",
    }
}

flow_steps! {
    /// Steps for browsing the user's agreements.
    pub enum AgreementListStep for FlowName::AgreementList {
        MyList => "my_list",
        ViewDetail => "view_detail",
        ConfirmComplete => "confirm_complete",
    }
}

flow_steps! {
    /// Steps for drafting a new agreement.
    pub enum AgreementCreateStep for FlowName::AgreementCreate {
        AskTitle => "ask_title",
        AskCounterparty => "ask_counterparty",
        AskAmount => "ask_amount",
        AskDueDate => "ask_due_date",
        Confirm => "confirm",
    }
}

flow_steps! {
    /// Steps for managing the seller's offers.
    pub enum OfferManageStep for FlowName::OfferManage {
        MyOffers => "my_offers",
        ManageOffer => "manage_offer",
        EditPrice => "edit_price",
        DeleteConfirm => "delete_confirm",
    }
}

flow_steps! {
    /// Steps for answering a buyer's product request.
    pub enum ProductRespondStep for FlowName::ProductRespond {
        ChooseRequest => "choose_request",
        AskPrice => "ask_price",
        AskPhoto => "ask_photo",
        AskLocation => "ask_location",
        Confirm => "confirm",
    }
}

flow_steps! {
    /// Steps for publishing a flash deal.
    pub enum FlashDealCreateStep for FlowName::FlashDealCreate {
        AskTitle => "ask_title",
        AskDiscount => "ask_discount",
        AskQuantity => "ask_quantity",
        AskDuration => "ask_duration",
        Confirm => "confirm",
    }
}

pub static MAIN_MENU: FlowDescriptor = FlowDescriptor::new(FlowName::MainMenu, MainMenuStep::NAMES);
pub static AGREEMENT_LIST: FlowDescriptor =
    FlowDescriptor::new(FlowName::AgreementList, AgreementListStep::NAMES);
pub static AGREEMENT_CREATE: FlowDescriptor =
    FlowDescriptor::new(FlowName::AgreementCreate, AgreementCreateStep::NAMES);
pub static OFFER_MANAGE: FlowDescriptor =
    FlowDescriptor::new(FlowName::OfferManage, OfferManageStep::NAMES);
pub static PRODUCT_RESPOND: FlowDescriptor =
    FlowDescriptor::new(FlowName::ProductRespond, ProductRespondStep::NAMES);
pub static FLASH_DEAL_CREATE: FlowDescriptor =
    FlowDescriptor::new(FlowName::FlashDealCreate, FlashDealCreateStep::NAMES);
