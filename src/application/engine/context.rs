//! Per-event handler context.
//!
//! A [`FlowContext`] is the only handle a flow handler gets on the session:
//! it exposes typed step and temp-data access, the transition operations and
//! outbound messaging addressed to the session's user. Cross-flow transitions
//! are recorded as a pending handoff that the router executes after the
//! handler returns.
//!
//! Once a handler's domain action has succeeded it calls
//! [`FlowContext::commit`]; a later failure in the same event rolls the
//! session back to that point, never before it.

use crate::domain::conversation::{
    ConversationSession, FlowData, FlowName, FlowStep, TransitionError,
};
use crate::domain::foundation::UserIdentifier;
use crate::ports::{Button, ListSection, MessageReceipt, Messenger};

use super::errors::FlowError;

/// A flow change requested by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    /// Flow that now owns the conversation.
    pub flow: FlowName,
    /// True when the handler picked an explicit step: the router re-prompts
    /// it instead of starting the flow.
    pub resume_step: bool,
}

/// Mutable view of one session for the duration of one event.
pub struct FlowContext<'a> {
    session: &'a mut ConversationSession,
    messenger: &'a dyn Messenger,
    handoff: Option<Handoff>,
    checkpoint: Option<ConversationSession>,
}

impl<'a> FlowContext<'a> {
    pub fn new(session: &'a mut ConversationSession, messenger: &'a dyn Messenger) -> Self {
        Self {
            session,
            messenger,
            handoff: None,
            checkpoint: None,
        }
    }

    pub fn session(&self) -> &ConversationSession {
        self.session
    }

    pub fn user(&self) -> &UserIdentifier {
        self.session.user_identifier()
    }

    /// Current step, typed for the flow `S` belongs to.
    ///
    /// `None` if another flow is active or the stored step is not one of `S`.
    pub fn step<S: FlowStep>(&self) -> Option<S> {
        if self.session.current_flow() != Some(S::FLOW) {
            return None;
        }
        self.session.current_step().and_then(S::parse)
    }

    /// Moves to another step of the active flow.
    pub fn set_step<S: FlowStep>(&mut self, step: S) -> Result<(), FlowError> {
        match self.session.current_flow() {
            Some(active) if active == S::FLOW => {
                self.session.set_step(step.as_str())?;
                Ok(())
            }
            Some(active) => Err(TransitionError::ForeignStep {
                active,
                step_flow: S::FLOW,
            }
            .into()),
            None => Err(TransitionError::NoActiveFlow {
                step: step.as_str().to_string(),
            }
            .into()),
        }
    }

    /// Moves to a step by its persisted name (used for "back" navigation).
    pub(crate) fn set_step_name(&mut self, step: &str) -> Result<(), FlowError> {
        self.session.set_step(step)?;
        Ok(())
    }

    /// Hands the conversation to another flow.
    ///
    /// Clears temp data. Without an explicit step the target starts at its
    /// initial step and its `start` runs; with one, that step is re-prompted.
    pub fn go_to_flow(&mut self, flow: FlowName, step: Option<&str>) -> Result<(), FlowError> {
        self.session.go_to_flow(flow, step)?;
        self.handoff = Some(Handoff {
            flow,
            resume_step: step.is_some(),
        });
        Ok(())
    }

    /// Abandons the active flow and shows the main menu.
    pub fn return_to_menu(&mut self) {
        self.session.return_to_menu();
        self.handoff = Some(Handoff {
            flow: FlowName::MainMenu,
            resume_step: false,
        });
    }

    /// Marks the current session as committed.
    ///
    /// Call right after a domain action succeeded and the session was moved
    /// past the step that triggered it. Errors raised afterwards (a failed
    /// notice, a failing handoff target) keep this position instead of
    /// restoring the one the event started from, so the action cannot be
    /// confirmed twice.
    pub fn commit(&mut self) {
        self.checkpoint = Some(self.session.clone());
    }

    /// Session as of the last [`commit`](Self::commit), if any.
    pub(crate) fn checkpoint(&self) -> Option<&ConversationSession> {
        self.checkpoint.as_ref()
    }

    pub(crate) fn take_checkpoint(&mut self) -> Option<ConversationSession> {
        self.checkpoint.take()
    }

    pub(crate) fn take_handoff(&mut self) -> Option<Handoff> {
        self.handoff.take()
    }

    /// Puts back an earlier copy of the session and drops any pending handoff.
    pub(crate) fn reset_to(&mut self, session: ConversationSession) {
        *self.session = session;
        self.handoff = None;
    }

    /// Typed view over the flow's temp data.
    ///
    /// Undecodable data (left by an older release or a defect) is discarded
    /// and the default returned.
    pub fn data<D: FlowData>(&self) -> D {
        match D::from_bag(self.session.temp_data()) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    user = %self.user(),
                    flow = ?self.session.current_flow(),
                    error = %e,
                    "Discarding undecodable temp data"
                );
                D::default()
            }
        }
    }

    /// Replaces the flow's temp data with `data`.
    pub fn store<D: FlowData>(&mut self, data: &D) -> Result<(), FlowError> {
        let bag = data.to_bag()?;
        self.session.replace_temp_data(bag);
        Ok(())
    }

    pub fn clear_data(&mut self) {
        self.session.clear_temp_data();
    }

    pub async fn send_text(&self, body: &str) -> Result<MessageReceipt, FlowError> {
        Ok(self.messenger.send_text(self.user(), body).await?)
    }

    pub async fn send_buttons(
        &self,
        body: &str,
        buttons: Vec<Button>,
    ) -> Result<MessageReceipt, FlowError> {
        Ok(self.messenger.send_buttons(self.user(), body, buttons).await?)
    }

    pub async fn send_list(
        &self,
        body: &str,
        button_text: &str,
        sections: Vec<ListSection>,
    ) -> Result<MessageReceipt, FlowError> {
        Ok(self
            .messenger
            .send_list(self.user(), body, button_text, sections)
            .await?)
    }

    pub async fn send_location(
        &self,
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    ) -> Result<MessageReceipt, FlowError> {
        Ok(self
            .messenger
            .send_location(self.user(), latitude, longitude, name)
            .await?)
    }

    pub async fn request_location(&self, body: &str) -> Result<MessageReceipt, FlowError> {
        Ok(self.messenger.request_location(self.user(), body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingMessenger;
    use crate::domain::conversation::{
        AgreementListStep, FlashDealCreateStep, MainMenuStep, TempData,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct ViewData {
        #[serde(default)]
        view_agreement_id: Option<i64>,
    }

    impl FlowData for ViewData {}

    fn session_in(flow: FlowName, step: &str) -> ConversationSession {
        ConversationSession::restore(
            UserIdentifier::new("628"),
            Some(flow),
            Some(step.to_string()),
            TempData::new(),
        )
    }

    #[test]
    fn typed_step_only_for_active_flow() {
        let messenger = RecordingMessenger::new();
        let mut session = session_in(FlowName::AgreementList, "view_detail");
        let ctx = FlowContext::new(&mut session, &messenger);

        assert_eq!(ctx.step::<AgreementListStep>(), Some(AgreementListStep::ViewDetail));
        assert_eq!(ctx.step::<MainMenuStep>(), None);
    }

    #[test]
    fn set_step_rejects_step_of_other_flow() {
        let messenger = RecordingMessenger::new();
        let mut session = session_in(FlowName::AgreementList, "my_list");
        let mut ctx = FlowContext::new(&mut session, &messenger);

        let err = ctx.set_step(FlashDealCreateStep::AskDiscount).unwrap_err();

        assert!(matches!(
            err,
            FlowError::Transition(TransitionError::ForeignStep { .. })
        ));
        assert_eq!(ctx.session().current_step(), Some("my_list"));
    }

    #[test]
    fn go_to_flow_records_handoff_and_clears_data() {
        let messenger = RecordingMessenger::new();
        let mut session = session_in(FlowName::AgreementList, "view_detail");
        let mut ctx = FlowContext::new(&mut session, &messenger);
        ctx.store(&ViewData {
            view_agreement_id: Some(3),
        })
        .unwrap();

        ctx.go_to_flow(FlowName::AgreementCreate, None).unwrap();

        assert_eq!(
            ctx.take_handoff(),
            Some(Handoff {
                flow: FlowName::AgreementCreate,
                resume_step: false
            })
        );
        assert!(ctx.session().temp_data().is_empty());
        assert_eq!(ctx.take_handoff(), None);
    }

    #[test]
    fn undecodable_data_falls_back_to_default() {
        let messenger = RecordingMessenger::new();
        let mut bag = TempData::new();
        bag.insert("view_agreement_id".to_string(), json!("forty-two"));
        let mut session = ConversationSession::restore(
            UserIdentifier::new("628"),
            Some(FlowName::AgreementList),
            Some("view_detail".to_string()),
            bag,
        );
        let ctx = FlowContext::new(&mut session, &messenger);

        assert_eq!(ctx.data::<ViewData>(), ViewData::default());
    }

    #[test]
    fn commit_snapshots_the_current_position() {
        let messenger = RecordingMessenger::new();
        let mut session = session_in(FlowName::FlashDealCreate, "confirm");
        let mut ctx = FlowContext::new(&mut session, &messenger);
        assert!(ctx.checkpoint().is_none());

        ctx.return_to_menu();
        ctx.commit();
        ctx.set_step(MainMenuStep::AwaitingSelection).unwrap();

        let committed = ctx.take_checkpoint().unwrap();
        assert_eq!(committed.current_flow(), Some(FlowName::MainMenu));
        assert_eq!(committed.current_step(), Some("awaiting_selection"));
        assert!(ctx.take_checkpoint().is_none());
    }

    #[tokio::test]
    async fn messages_are_addressed_to_session_user() {
        let messenger = RecordingMessenger::new();
        let mut session = session_in(FlowName::MainMenu, "awaiting_selection");
        let ctx = FlowContext::new(&mut session, &messenger);

        ctx.send_text("hello").await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.as_str(), "628");
    }
}
