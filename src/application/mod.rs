//! Application layer - dispatch engine and conversational flows.
//!
//! - `engine` - Routes each inbound event to the handler of the sender's
//!   active flow and enforces the step-set invariant
//! - `flows` - The marketplace flow handlers

pub mod engine;
pub mod flows;

pub use engine::{
    DispatchOutcome, DispatchReport, FlowContext, FlowError, FlowHandler, FlowRegistry,
    FlowRouter, RouterConfig, RouterError, StepOutcome,
};
pub use flows::{default_registry, MarketplaceServices};
