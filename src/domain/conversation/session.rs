//! Conversation session aggregate.
//!
//! One session exists per user identifier. It records where the user is
//! inside the conversation (flow + step) and the flow-scoped temp data.
//!
//! # Invariants
//!
//! - `current_step` is `Some` only while `current_flow` is `Some`
//! - `current_step`, when set through this API, belongs to the active flow's
//!   step set
//! - `temp_data` never survives a flow change
//!
//! Sessions are never deleted; completion, abandonment and "menu" idle them
//! back.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId, UserIdentifier};

use super::errors::TransitionError;
use super::flow::FlowName;
use super::temp_data::TempData;

/// Per-user conversation position and flow-scoped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    user_identifier: UserIdentifier,

    #[serde(default)]
    current_flow: Option<FlowName>,

    #[serde(default)]
    current_step: Option<String>,

    #[serde(default)]
    temp_data: TempData,

    #[serde(default)]
    user_id: Option<UserId>,

    created_at: Timestamp,

    updated_at: Timestamp,
}

impl ConversationSession {
    /// Creates an idle session for a user seen for the first time.
    pub fn new(user_identifier: UserIdentifier) -> Self {
        let now = Timestamp::now();
        Self {
            user_identifier,
            current_flow: None,
            current_step: None,
            temp_data: TempData::new(),
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restores a session at an arbitrary position.
    ///
    /// Used by stores and tests; the position is not validated, the router
    /// recovers from pairs the flow does not declare.
    pub fn restore(
        user_identifier: UserIdentifier,
        current_flow: Option<FlowName>,
        current_step: Option<String>,
        temp_data: TempData,
    ) -> Self {
        Self {
            current_flow,
            current_step,
            temp_data,
            ..Self::new(user_identifier)
        }
    }

    pub fn user_identifier(&self) -> &UserIdentifier {
        &self.user_identifier
    }

    pub fn current_flow(&self) -> Option<FlowName> {
        self.current_flow
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current_step.as_deref()
    }

    pub fn temp_data(&self) -> &TempData {
        &self.temp_data
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true when no flow is active.
    pub fn is_idle(&self) -> bool {
        self.current_flow.is_none()
    }

    /// Returns true if the stored (flow, step) pair satisfies the step-set
    /// invariant. An idle session is valid only without a step.
    pub fn has_valid_position(&self) -> bool {
        match (self.current_flow, self.current_step.as_deref()) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(_), None) => false,
            (Some(flow), Some(step)) => flow.descriptor().declares(step),
        }
    }

    /// Moves to another step of the active flow.
    ///
    /// # Errors
    ///
    /// - `NoActiveFlow` if the session is idle
    /// - `StepNotDeclared` if the active flow does not declare `step`
    pub fn set_step(&mut self, step: &str) -> Result<(), TransitionError> {
        let flow = self.current_flow.ok_or_else(|| TransitionError::NoActiveFlow {
            step: step.to_string(),
        })?;
        if !flow.descriptor().declares(step) {
            return Err(TransitionError::StepNotDeclared {
                flow,
                step: step.to_string(),
            });
        }
        self.current_step = Some(step.to_string());
        Ok(())
    }

    /// Hands the conversation to another flow.
    ///
    /// Temp data is always cleared. Without an explicit step the target's
    /// initial step is used.
    ///
    /// # Errors
    ///
    /// - `StepNotDeclared` if `step` is not in the target's step set
    pub fn go_to_flow(&mut self, flow: FlowName, step: Option<&str>) -> Result<(), TransitionError> {
        let descriptor = flow.descriptor();
        let step = step.unwrap_or(descriptor.initial_step);
        if !descriptor.declares(step) {
            return Err(TransitionError::StepNotDeclared {
                flow,
                step: step.to_string(),
            });
        }
        self.current_flow = Some(flow);
        self.current_step = Some(step.to_string());
        self.temp_data.clear();
        Ok(())
    }

    /// Global navigation back to the main menu.
    pub fn return_to_menu(&mut self) {
        self.current_flow = Some(FlowName::MainMenu);
        self.current_step = Some(FlowName::MainMenu.descriptor().initial_step.to_string());
        self.temp_data.clear();
    }

    /// Drops the active flow entirely.
    pub fn idle(&mut self) {
        self.current_flow = None;
        self.current_step = None;
        self.temp_data.clear();
    }

    /// Replaces the temp-data bag of the active flow.
    pub fn replace_temp_data(&mut self, temp_data: TempData) {
        self.temp_data = temp_data;
    }

    pub fn clear_temp_data(&mut self) {
        self.temp_data.clear();
    }

    /// Links the session to a registered user.
    pub fn link_user(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    /// Records activity on the session.
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    /// Returns true if the session saw no activity for longer than
    /// `idle_timeout_secs` as of `now`. A zero timeout never expires.
    pub fn is_expired(&self, idle_timeout_secs: u64, now: Timestamp) -> bool {
        if idle_timeout_secs == 0 {
            return false;
        }
        let idle_for = now.duration_since(&self.updated_at).num_seconds();
        idle_for > 0 && idle_for as u64 > idle_timeout_secs
    }

    #[cfg(test)]
    pub(crate) fn set_updated_at(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}
