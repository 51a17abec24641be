//! Error types for the dispatch engine.

use crate::domain::conversation::{TempDataError, TransitionError};
use crate::ports::{MessagingError, ServiceError, SessionStoreError};

/// Failures raised while a handler processes an event.
///
/// Validation failures are not errors: they travel as
/// `StepOutcome::Invalid`. Everything here aborts the event, rolls the
/// session back and offers the user a retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("Messaging failed: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Marketplace service failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Illegal transition: {0}")]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    TempData(#[from] TempDataError),
}

impl FlowError {
    /// Returns true for handler defects (as opposed to collaborator faults).
    pub fn is_defect(&self) -> bool {
        matches!(self, FlowError::Transition(_) | FlowError::TempData(_))
    }
}

/// Failures that prevent the router from processing an event at all.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Event has no sender")]
    MissingSender,

    #[error("Session store failed: {0}")]
    Store(#[from] SessionStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_are_defects() {
        let err = FlowError::from(TransitionError::NoActiveFlow {
            step: "x".to_string(),
        });
        assert!(err.is_defect());
    }

    #[test]
    fn collaborator_errors_are_not_defects() {
        let err = FlowError::from(ServiceError::Timeout);
        assert!(!err.is_defect());
        let err = FlowError::from(MessagingError::Timeout { timeout_secs: 5 });
        assert!(!err.is_defect());
    }

    #[test]
    fn router_error_wraps_store_error() {
        let err = RouterError::from(SessionStoreError::IoError("gone".to_string()));
        assert!(err.to_string().contains("Session store failed"));
    }
}
