//! Recording Messenger - captures outbound messages instead of sending them.
//!
//! Used by tests and local development. Failures can be injected to exercise
//! the router's rollback path.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::foundation::UserIdentifier;
use crate::ports::{MessageReceipt, Messenger, MessagingError, OutboundMessage};

/// A message captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub to: UserIdentifier,
    pub message: OutboundMessage,
}

#[derive(Debug, Default)]
struct Recorded {
    sent: Vec<SentMessage>,
    pending_failures: Vec<MessagingError>,
}

/// Messenger that records every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingMessenger {
    recorded: Arc<Mutex<Recorded>>,
    counter: Arc<AtomicU64>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next send fail with `error`. Calls queue up.
    pub fn fail_next(&self, error: MessagingError) {
        self.state().pending_failures.push(error);
    }

    /// Every message sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Messages sent to one user.
    pub fn sent_to(&self, user: &UserIdentifier) -> Vec<OutboundMessage> {
        self.state()
            .sent
            .iter()
            .filter(|m| &m.to == user)
            .map(|m| m.message.clone())
            .collect()
    }

    pub fn last(&self) -> Option<SentMessage> {
        self.state().sent.last().cloned()
    }

    pub fn clear(&self) {
        self.state().sent.clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        to: &UserIdentifier,
        message: OutboundMessage,
    ) -> Result<MessageReceipt, MessagingError> {
        let mut recorded = self.state();
        if !recorded.pending_failures.is_empty() {
            return Err(recorded.pending_failures.remove(0));
        }
        recorded.sent.push(SentMessage {
            to: to.clone(),
            message,
        });
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(MessageReceipt {
            message_id: format!("recorded-{}", n),
        })
    }
}
