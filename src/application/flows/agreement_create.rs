//! AgreementCreate flow - draft an agreement field by field, then create it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::engine::{FlowContext, FlowError, FlowHandler, StepOutcome};
use crate::domain::conversation::validation::{
    parse_amount_cents, parse_future_date, parse_phone, parse_title,
};
use crate::domain::conversation::{
    AgreementCreateStep, FlowData, FlowDescriptor, FlowName, FlowStep, IncomingEvent,
    InvalidInput, AGREEMENT_CREATE,
};
use crate::domain::marketplace::{format_amount, NewAgreement};
use crate::ports::AgreementService;

use super::{confirm_buttons, read_confirmation, text_answer, today};

/// Temp data of the agreement draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementCreateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl FlowData for AgreementCreateData {}

impl AgreementCreateData {
    /// The complete command, once every field has been answered.
    fn to_command(&self) -> Option<NewAgreement> {
        Some(NewAgreement {
            title: self.title.clone()?,
            counterparty_phone: self.counterparty_phone.clone()?,
            amount_cents: self.amount_cents?,
            due_date: self.due_date?,
        })
    }
}

pub struct AgreementCreateHandler {
    agreements: Arc<dyn AgreementService>,
}

impl AgreementCreateHandler {
    pub fn new(agreements: Arc<dyn AgreementService>) -> Self {
        Self { agreements }
    }

    /// Stores one answer and moves to the next step.
    async fn advance(
        &self,
        ctx: &mut FlowContext<'_>,
        data: &AgreementCreateData,
        next: AgreementCreateStep,
    ) -> Result<StepOutcome, FlowError> {
        ctx.store(data)?;
        ctx.set_step(next)?;
        self.prompt_step(ctx).await?;
        Ok(StepOutcome::Advanced)
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
            ctx.send_text("Okay, the agreement was discarded.").await?;
            ctx.return_to_menu();
            return Ok(StepOutcome::Advanced);
        }

        let Some(command) = ctx.data::<AgreementCreateData>().to_command() else {
            tracing::warn!(user = %ctx.user(), "Agreement draft incomplete at confirm; restarting");
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        let agreement = self.agreements.create(ctx.user(), command).await?;
        tracing::info!(user = %ctx.user(), agreement_id = %agreement.id, "Agreement created");
        ctx.go_to_flow(FlowName::AgreementList, None)?;
        ctx.commit();

        ctx.send_text(&format!("Agreement \"{}\" created.", agreement.title))
            .await?;
        Ok(StepOutcome::Advanced)
    }
}

#[async_trait]
impl FlowHandler for AgreementCreateHandler {
    fn descriptor(&self) -> &'static FlowDescriptor {
        &AGREEMENT_CREATE
    }

    fn previous_step(&self, step: &str) -> Option<&'static str> {
        let step = AgreementCreateStep::parse(step)?;
        let position = AgreementCreateStep::ALL.iter().position(|s| *s == step)?;
        position
            .checked_sub(1)
            .map(|previous| AgreementCreateStep::ALL[previous].as_str())
    }

    async fn start(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        ctx.clear_data();
        ctx.set_step(AgreementCreateStep::AskTitle)?;
        self.prompt_step(ctx).await
    }

    async fn handle(
        &self,
        ctx: &mut FlowContext<'_>,
        event: &IncomingEvent,
    ) -> Result<StepOutcome, FlowError> {
        let Some(step) = ctx.step::<AgreementCreateStep>() else {
            self.start(ctx).await?;
            return Ok(StepOutcome::Advanced);
        };

        let mut data = ctx.data::<AgreementCreateData>();
        let parsed: Result<AgreementCreateStep, InvalidInput> = match step {
            AgreementCreateStep::Confirm => return self.confirm(ctx, event).await,
            AgreementCreateStep::AskTitle => {
                text_answer(event, |text| parse_title("title", text, 3, 80)).map(|title| {
                    data.title = Some(title);
                    AgreementCreateStep::AskCounterparty
                })
            }
            AgreementCreateStep::AskCounterparty => {
                text_answer(event, |text| parse_phone("counterparty_phone", text)).map(|phone| {
                    data.counterparty_phone = Some(phone);
                    AgreementCreateStep::AskAmount
                })
            }
            AgreementCreateStep::AskAmount => {
                text_answer(event, |text| parse_amount_cents("amount", text)).map(|cents| {
                    data.amount_cents = Some(cents);
                    AgreementCreateStep::AskDueDate
                })
            }
            AgreementCreateStep::AskDueDate => {
                text_answer(event, |text| parse_future_date("due_date", text, today())).map(
                    |date| {
                        data.due_date = Some(date);
                        AgreementCreateStep::Confirm
                    },
                )
            }
        };

        match parsed {
            Ok(next) => self.advance(ctx, &data, next).await,
            Err(invalid) => Ok(invalid.into()),
        }
    }

    async fn prompt_step(&self, ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        let Some(step) = ctx.step::<AgreementCreateStep>() else {
            return Ok(());
        };
        match step {
            AgreementCreateStep::AskTitle => {
                ctx.send_text("What is this agreement about? Send a short title.")
                    .await?;
            }
            AgreementCreateStep::AskCounterparty => {
                ctx.send_text("What is the phone number of the other party?")
                    .await?;
            }
            AgreementCreateStep::AskAmount => {
                ctx.send_text("What is the agreed amount? For example 150000 or 1250.50.")
                    .await?;
            }
            AgreementCreateStep::AskDueDate => {
                ctx.send_text("When is it due? Send a date like 2030-01-31 or 31/01/2030.")
                    .await?;
            }
            AgreementCreateStep::Confirm => {
                let data = ctx.data::<AgreementCreateData>();
                let summary = format!(
                    "Please confirm the agreement:\nTitle: {}\nCounterparty: {}\nAmount: {}\nDue: {}",
                    data.title.as_deref().unwrap_or("-"),
                    data.counterparty_phone.as_deref().unwrap_or("-"),
                    data.amount_cents.map(format_amount).unwrap_or_else(|| "-".to_string()),
                    data.due_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                );
                ctx.send_buttons(&summary, confirm_buttons()).await?;
            }
        }
        Ok(())
    }
}
