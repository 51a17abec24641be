//! MainMenu flow - entry point and fallback of every conversation.

use async_trait::async_trait;

use crate::application::engine::{FlowContext, FlowError, FlowHandler, StepOutcome};
use crate::domain::conversation::{
    Expected, FlowDescriptor, FlowName, IncomingEvent, InvalidInput, MainMenuStep, MAIN_MENU,
};
use crate::ports::{ListRow, ListSection};

use super::MENU_ENTRIES;

const MENU_PROMPT: &str = "What would you like to do? Pick an option from the menu.";

pub struct MainMenuHandler;

impl MainMenuHandler {
    pub fn new() -> Self {
        Self
    }

    /// Maps a selection id, a typed menu number or a typed title to a flow.
    fn resolve(text_or_id: &str) -> Option<FlowName> {
        let value = text_or_id.trim();
        if let Ok(flow) = value.parse::<FlowName>() {
            return (flow != FlowName::MainMenu).then_some(flow);
        }
        if let Ok(position) = value.parse::<usize>() {
            return MENU_ENTRIES
                .get(position.checked_sub(1)?)
                .map(|(flow, _, _)| *flow);
        }
        MENU_ENTRIES
            .iter()
            .find(|(_, title, _)| title.eq_ignore_ascii_case(value))
            .map(|(flow, _, _)| *flow)
    }
}

impl Default for MainMenuHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlowHandler for MainMenuHandler {
    fn descriptor(&self) -> &'static FlowDescriptor {
        &MAIN_MENU
    }

    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.clear_data();
        ctx.set_step(MainMenuStep::AwaitingSelection)?;
        self.prompt_step(ctx).await
    }

    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let Some(choice) = event.selection_id().or_else(|| event.text_content()) else {
            return Ok(InvalidInput::WrongKind {
                expected: Expected::Selection,
                got: event.kind(),
            }
            .into());
        };

        match Self::resolve(choice) {
            Some(flow) => {
                tracing::debug!(user = %ctx.user(), flow = %flow, "Main menu selection");
                ctx.go_to_flow(flow, None)?;
                Ok(StepOutcome::Advanced)
            }
            None => Ok(InvalidInput::UnknownSelection(choice.to_string()).into()),
        }
    }

    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let rows = MENU_ENTRIES
            .iter()
            .map(|(flow, title, description)| {
                ListRow::new(flow.as_str(), *title).with_description(*description)
            })
            .collect();
        ctx.send_list(MENU_PROMPT, "Menu", vec![ListSection::new("Marketplace", rows)])
            .await?;
        Ok(())
    }
}
