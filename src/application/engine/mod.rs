//! Dispatch engine - routes inbound events to flow handlers.
//!
//! - `router` - Per-event dispatch algorithm (`FlowRouter`)
//! - `handler` - The `FlowHandler` contract and `StepOutcome`
//! - `context` - Per-event handler view of the session (`FlowContext`)
//! - `registry` - Flow name to handler map
//! - `locks` - Per-user session locks

mod context;
mod errors;
mod handler;
mod locks;
mod registry;
mod router;

pub use context::{FlowContext, Handoff};
pub use errors::{FlowError, RouterError};
pub use handler::{FlowHandler, StepOutcome};
pub use locks::SessionLocks;
pub use registry::FlowRegistry;
pub use router::{
    DispatchOutcome, DispatchReport, FlowRouter, RouterConfig, GENERIC_ERROR_MESSAGE,
};
