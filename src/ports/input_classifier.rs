//! Input Classifier Port - Normalizes raw transport payloads.
//!
//! Classification never fails: unknown shapes degrade to text when content
//! can be extracted, or to an `Unrecognized` event every handler rejects as
//! invalid input.

use serde_json::Value;

use crate::domain::conversation::IncomingEvent;

/// Port for turning transport payloads into [`IncomingEvent`]s.
pub trait InputClassifier: Send + Sync {
    /// Classifies a single transport message object.
    fn classify(&self, message: &Value) -> IncomingEvent;

    /// Extracts and classifies every message carried by a webhook delivery.
    ///
    /// Deliveries without messages (e.g. status callbacks) yield nothing.
    fn classify_webhook(&self, payload: &Value) -> Vec<IncomingEvent>;
}
