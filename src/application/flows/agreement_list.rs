//! AgreementList flow - browse agreements and mark them complete.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::engine::{FlowContext, FlowError, FlowHandler, StepOutcome};
use crate::domain::conversation::validation::require_selection;
use crate::domain::conversation::{
    entity_selection_id, has_selection_prefix, parse_entity_selection, AgreementListStep,
    FlowData, FlowDescriptor, FlowName, FlowStep, IncomingEvent, InvalidInput, AGREEMENT_LIST,
};
use crate::domain::foundation::AgreementId;
use crate::domain::marketplace::{format_amount, Agreement};
use crate::ports::{AgreementService, Button, ListRow, ListSection};

use super::{back_button, confirm_buttons, menu_button, read_confirmation};

/// Selection prefix of agreement rows.
pub const AGREEMENT_PREFIX: &str = "agreement";
/// Selection id that jumps to agreement creation.
pub const NEW_AGREEMENT_ID: &str = "new_agreement";
/// Selection id that asks to complete the viewed agreement.
pub const COMPLETE_ID: &str = "complete";

/// Rows shown before the "new agreement" row.
const MAX_LISTED: usize = 9;

/// Temp data of the agreement list flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementListData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_agreement_id: Option<i64>,
}

impl FlowData for AgreementListData {}

pub struct AgreementListHandler {
    agreements: Arc<dyn AgreementService>,
}

impl AgreementListHandler {
    pub fn new(agreements: Arc<dyn AgreementService>) -> Self {
        Self { agreements }
    }

    /// Loads the agreement under view, if it still exists.
    async fn viewed(&self, ctx: &FlowContext<'_>) -> Result<Option<Agreement>, FlowError> {
        let Some(id) = ctx.data::<AgreementListData>().view_agreement_id else {
            return Ok(None);
        };
        Ok(self.agreements.get(ctx.user(), AgreementId::new(id)).await?)
    }

    /// Returns to the list after the viewed agreement disappeared.
    async fn lost_agreement(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.send_text("That agreement is no longer available.").await?;
        self.start(ctx).await
    }

    async fn show_list(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let agreements = self.agreements.list_for(ctx.user()).await?;
        if agreements.is_empty() {
            ctx.send_buttons(
                "You don't have any agreements yet.",
                vec![
                    Button::new(NEW_AGREEMENT_ID, "New agreement"),
                    menu_button(),
                ],
            )
            .await?;
            return Ok(());
        }

        let mut rows: Vec<ListRow> = agreements
            .iter()
            .take(MAX_LISTED)
            .map(|a| {
                ListRow::new(entity_selection_id(AGREEMENT_PREFIX, a.id.value()), &a.title)
                    .with_description(format!(
                        "{} · {} · due {}",
                        format_amount(a.amount_cents),
                        a.status.label(),
                        a.due_date
                    ))
            })
            .collect();
        rows.push(ListRow::new(NEW_AGREEMENT_ID, "New agreement"));

        ctx.send_list(
            "Your agreements. Pick one to see the details.",
            "Agreements",
            vec![ListSection::new("Agreements", rows)],
        )
        .await?;
        Ok(())
    }

    async fn show_detail(
        &self,
        ctx: &mut FlowContext<'_>,
        agreement: &Agreement,
    ) -> Result<(), FlowError> {
        let body = format!(
            "{}\nCounterparty: {}\nAmount: {}\nDue: {}\nStatus: {}",
            agreement.title,
            agreement.counterparty_phone,
            format_amount(agreement.amount_cents),
            agreement.due_date,
            agreement.status.label()
        );
        let mut buttons = Vec::with_capacity(3);
        if agreement.is_active() {
            buttons.push(Button::new(COMPLETE_ID, "Mark complete"));
        }
        buttons.push(back_button());
        buttons.push(menu_button());
        ctx.send_buttons(&body, buttons).await?;
        Ok(())
    }

    async fn handle_list_selection(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let selection = match require_selection(event) {
            Ok(selection) => selection,
            Err(invalid) => return Ok(invalid.into()),
        };

        if selection == NEW_AGREEMENT_ID {
            ctx.go_to_flow(FlowName::AgreementCreate, None)?;
            return Ok(StepOutcome::Advanced);
        }

        match parse_entity_selection(selection, AGREEMENT_PREFIX) {
            Some(id) => {
                ctx.store(&AgreementListData {
                    view_agreement_id: Some(id),
                })?;
                ctx.set_step(AgreementListStep::ViewDetail)?;
                self.prompt_step(ctx).await?;
                Ok(StepOutcome::Advanced)
            }
            None if has_selection_prefix(selection, AGREEMENT_PREFIX) => {
                tracing::debug!(user = %ctx.user(), selection, "Malformed agreement selection");
                self.start(ctx).await?;
                Ok(StepOutcome::Advanced)
            }
            None => Ok(InvalidInput::UnknownSelection(selection.to_string()).into()),
        }
    }
}

#[async_trait]
impl FlowHandler for AgreementListHandler {
    fn descriptor(&self) -> &'static FlowDescriptor {
        &AGREEMENT_LIST
    }

    fn previous_step(&self, step: &str) -> Option<&'static str> {
        match AgreementListStep::parse(step)? {
            AgreementListStep::MyList => None,
            AgreementListStep::ViewDetail => Some(AgreementListStep::MyList.as_str()),
            AgreementListStep::ConfirmComplete => Some(AgreementListStep::ViewDetail.as_str()),
        }
    }

    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.clear_data();
        ctx.set_step(AgreementListStep::MyList)?;
        self.show_list(ctx).await
    }

    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let Some(step) = ctx.step::<AgreementListStep>() else {
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        match step {
            AgreementListStep::MyList => self.handle_list_selection(ctx, event).await,

            AgreementListStep::ViewDetail => {
                let selection = match require_selection(event) {
                    Ok(selection) => selection,
                    Err(invalid) => return Ok(invalid.into()),
                };
                if selection != COMPLETE_ID {
                    return Ok(InvalidInput::UnknownSelection(selection.to_string()).into());
                }
                match self.viewed(ctx).await? {
                    Some(agreement) if agreement.is_active() => {
                        ctx.set_step(AgreementListStep::ConfirmComplete)?;
                        self.prompt_step(ctx).await?;
                        Ok(StepOutcome::Advanced)
                    }
                    Some(_) => Ok(InvalidInput::UnknownSelection(selection.to_string()).into()),
                    None => {
                        self.lost_agreement(ctx).await?;
                        Ok(StepOutcome::Advanced)
                    }
                }
            }

            AgreementListStep::ConfirmComplete => {
                let confirmed = match read_confirmation(event) {
                    Ok(confirmed) => confirmed,
                    Err(invalid) => return Ok(invalid.into()),
                };
                let Some(agreement) = self.viewed(ctx).await? else {
                    self.lost_agreement(ctx).await?;
                    return Ok(StepOutcome::Advanced);
                };

                ctx.set_step(AgreementListStep::ViewDetail)?;
                if confirmed {
                    let completed = self.agreements.mark_complete(ctx.user(), agreement.id).await?;
                    tracing::info!(
                        user = %ctx.user(),
                        agreement_id = %completed.id,
                        "Agreement marked complete"
                    );
                    ctx.commit();
                    ctx.send_text(&format!("Done! \"{}\" is now completed.", completed.title))
                        .await?;
                }
                self.prompt_step(ctx).await?;
                Ok(StepOutcome::Advanced)
            }
        }
    }

    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        match ctx.step::<AgreementListStep>() {
            Some(AgreementListStep::MyList) | None => self.show_list(ctx).await,
            Some(AgreementListStep::ViewDetail) => match self.viewed(ctx).await? {
                Some(agreement) => self.show_detail(ctx, &agreement).await,
                None => self.lost_agreement(ctx).await,
            },
            Some(AgreementListStep::ConfirmComplete) => match self.viewed(ctx).await? {
                Some(agreement) => {
                    ctx.send_buttons(
                        &format!("Mark \"{}\" as completed?", agreement.title),
                        confirm_buttons(),
                    )
                    .await?;
                    Ok(())
                }
                None => self.lost_agreement(ctx).await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryMarketplace, RecordingMessenger};
    use crate::application::engine::Handoff;
    use crate::domain::conversation::{ConversationSession, TempData};
    use crate::domain::foundation::UserIdentifier;
    use crate::domain::marketplace::AgreementStatus;
    use crate::ports::ServiceError;
    use chrono::NaiveDate;

    fn agreement(id: i64) -> Agreement {
        Agreement {
            id: AgreementId::new(id),
            owner: UserIdentifier::new("628"),
            title: "Rice delivery".to_string(),
            counterparty_phone: "62811122233".to_string(),
            amount_cents: 150_000,
            due_date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            status: AgreementStatus::Active,
        }
    }

    fn session_at(step: AgreementListStep, data: AgreementListData) -> ConversationSession {
        ConversationSession::restore(
            UserIdentifier::new("628"),
            Some(FlowName::AgreementList),
            Some(step.as_str().to_string()),
            data.to_bag().unwrap_or_else(|_| TempData::new()),
        )
    }

    #[tokio::test]
    async fn selecting_agreement_shows_detail() {
        let market = Arc::new(InMemoryMarketplace::new());
        market.insert_agreement(agreement(42)).await;
        let handler = AgreementListHandler::new(market);
        let messenger = RecordingMessenger::new();
        let mut session = session_at(AgreementListStep::MyList, AgreementListData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let outcome = handler
            .handle(&mut ctx, &IncomingEvent::list_reply("628", "agreement_42", "Rice delivery"))
            .await
            .unwrap();

        assert_eq!(outcome, StepOutcome::Advanced);
        assert_eq!(ctx.step::<AgreementListStep>(), Some(AgreementListStep::ViewDetail));
        assert_eq!(ctx.data::<AgreementListData>().view_agreement_id, Some(42));
        assert!(messenger.sent()[0].message.option_ids().contains(&COMPLETE_ID));
    }

    #[tokio::test]
    async fn malformed_selection_restarts_flow() {
        let market = Arc::new(InMemoryMarketplace::new());
        let handler = AgreementListHandler::new(market);
        let messenger = RecordingMessenger::new();
        let mut session = session_at(AgreementListStep::MyList, AgreementListData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let outcome = handler
            .handle(&mut ctx, &IncomingEvent::list_reply("628", "agreement_abc", "?"))
            .await
            .unwrap();

        assert_eq!(outcome, StepOutcome::Advanced);
        assert_eq!(ctx.step::<AgreementListStep>(), Some(AgreementListStep::MyList));
        assert!(ctx.session().temp_data().is_empty());
    }

    #[tokio::test]
    async fn new_agreement_hands_off_to_create_flow() {
        let market = Arc::new(InMemoryMarketplace::new());
        let handler = AgreementListHandler::new(market);
        let messenger = RecordingMessenger::new();
        let mut session = session_at(AgreementListStep::MyList, AgreementListData::default());
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::button_reply("628", NEW_AGREEMENT_ID, "New"))
            .await
            .unwrap();

        assert_eq!(
            ctx.take_handoff(),
            Some(Handoff {
                flow: FlowName::AgreementCreate,
                resume_step: false
            })
        );
    }

    #[tokio::test]
    async fn confirming_completes_agreement() {
        let market = Arc::new(InMemoryMarketplace::new());
        market.insert_agreement(agreement(7)).await;
        let handler = AgreementListHandler::new(market.clone());
        let messenger = RecordingMessenger::new();
        let mut session = session_at(
            AgreementListStep::ConfirmComplete,
            AgreementListData {
                view_agreement_id: Some(7),
            },
        );
        let mut ctx = FlowContext::new(&mut session, &messenger);

        handler
            .handle(&mut ctx, &IncomingEvent::button_reply("628", "confirm_yes", "Confirm"))
            .await
            .unwrap();

        let stored = AgreementService::get(
            market.as_ref(),
            &UserIdentifier::new("628"),
            AgreementId::new(7),
        )
        .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, AgreementStatus::Completed);
        assert_eq!(ctx.step::<AgreementListStep>(), Some(AgreementListStep::ViewDetail));
    }

    #[tokio::test]
    async fn service_failure_propagates() {
        let market = Arc::new(InMemoryMarketplace::new());
        market.insert_agreement(agreement(7)).await;
        market.fail_next(ServiceError::Unavailable("down".to_string()));
        let handler = AgreementListHandler::new(market);
        let messenger = RecordingMessenger::new();
        let mut session = session_at(
            AgreementListStep::ConfirmComplete,
            AgreementListData {
                view_agreement_id: Some(7),
            },
        );
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let err = handler
            .handle(&mut ctx, &IncomingEvent::button_reply("628", "confirm_yes", "Confirm"))
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Service(ServiceError::Unavailable(_))));
    }

    #[test]
    fn back_walks_towards_list() {
        let handler = AgreementListHandler::new(Arc::new(InMemoryMarketplace::new()));
        assert_eq!(handler.previous_step("confirm_complete"), Some("view_detail"));
        assert_eq!(handler.previous_step("view_detail"), Some("my_list"));
        assert_eq!(handler.previous_step("my_list"), None);
    }

    #[tokio::test]
    async fn start_twice_lists_the_same_agreements() {
        let market = Arc::new(InMemoryMarketplace::new());
        market.insert_agreement(agreement(42)).await;
        let session = session_at(
            AgreementListStep::ConfirmComplete,
            AgreementListData {
                view_agreement_id: Some(42),
            },
        );

        crate::application::flows::assert_start_is_idempotent(
            &AgreementListHandler::new(market.clone()),
            &market,
            session,
        )
        .await;
    }
}
