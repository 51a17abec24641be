//! FlowHandler - the contract every conversational flow implements.

use async_trait::async_trait;

use crate::domain::conversation::{FlowDescriptor, FlowName, IncomingEvent, InvalidInput};

use super::context::FlowContext;
use super::errors::FlowError;

/// Result of handling one event in a flow.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The input was accepted; the session may have moved.
    Advanced,
    /// The input was rejected; the session must not move.
    Invalid(InvalidInput),
}

impl From<InvalidInput> for StepOutcome {
    fn from(invalid: InvalidInput) -> Self {
        StepOutcome::Invalid(invalid)
    }
}

/// A conversational flow.
///
/// Handlers are stateless: everything they remember between events lives in
/// the session's step and temp data, reached through [`FlowContext`].
#[async_trait]
pub trait FlowHandler: Send + Sync {
    /// Static descriptor of the flow this handler owns.
    fn descriptor(&self) -> &'static FlowDescriptor;

    fn name(&self) -> FlowName {
        self.descriptor().name
    }

    /// Returns true if `step` is one this handler can process.
    fn can_handle_step(&self, step: &str) -> bool {
        self.descriptor().declares(step)
    }

    /// Step "back" navigation returns to from `step`, if any.
    fn previous_step(&self, _step: &str) -> Option<&'static str> {
        None
    }

    /// Enters the flow: resets its data, moves to the initial step and
    /// prompts for it. Running it twice leaves the same state.
    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError>;

    /// Processes one event at the current step.
    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError>;

    /// Re-sends the prompt of the current step without changing state.
    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError>;

    /// Tells the user why the input was rejected and re-prompts.
    async fn handle_invalid_input(
        &self,
        ctx: &mut FlowContext<'_>,
        invalid: &InvalidInput,
    ) -> Result<(), FlowError> {
        ctx.send_text(&invalid.notice()).await?;
        self.prompt_step(ctx).await
    }
}
