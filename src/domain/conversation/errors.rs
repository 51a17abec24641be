//! Error types for conversation state transitions.

use super::FlowName;

/// Illegal writes to a session's flow position.
///
/// These are programming defects in a handler, never a reaction to user
/// input; the session is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Step '{step}' is not declared by flow {flow}")]
    StepNotDeclared { flow: FlowName, step: String },

    #[error("Cannot set step '{step}' while no flow is active")]
    NoActiveFlow { step: String },

    #[error("Step of flow {step_flow} written while {active} is active")]
    ForeignStep { active: FlowName, step_flow: FlowName },
}

/// Failures moving typed flow data in and out of the generic temp-data bag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TempDataError {
    #[error("Failed to encode temp data: {0}")]
    Encode(String),

    #[error("Failed to decode temp data: {0}")]
    Decode(String),

    #[error("Temp data must encode to a JSON object")]
    NotAnObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_not_declared_names_flow_and_step() {
        let err = TransitionError::StepNotDeclared {
            flow: FlowName::OfferManage,
            step: "ask_title".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Step 'ask_title' is not declared by flow offer_manage"
        );
    }

    #[test]
    fn temp_data_not_an_object_message() {
        assert_eq!(
            TempDataError::NotAnObject.to_string(),
            "Temp data must encode to a JSON object"
        );
    }
}
