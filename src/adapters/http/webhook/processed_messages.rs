//! Record of inbound message ids that were already dispatched.
//!
//! The transport redelivers a whole envelope when the endpoint answers with
//! an error. Events that made it through the router on an earlier attempt
//! are looked up here and skipped, so only the failed ones run again.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Message ids remembered before the oldest are evicted.
pub const DEFAULT_CAPACITY: usize = 4_096;

#[derive(Debug, Default)]
struct Seen {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

/// Bounded, in-process set of dispatched message ids.
#[derive(Debug)]
pub struct ProcessedMessages {
    seen: Mutex<Seen>,
    capacity: usize,
}

impl Default for ProcessedMessages {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ProcessedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(Seen::default()),
            capacity: capacity.max(1),
        }
    }

    fn seen(&self) -> std::sync::MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns true if `message_id` was already dispatched.
    pub fn contains(&self, message_id: &str) -> bool {
        self.seen().ids.contains(message_id)
    }

    /// Remembers `message_id` as dispatched, evicting the oldest entry when full.
    pub fn mark_processed(&self, message_id: &str) {
        let mut seen = self.seen();
        if !seen.ids.insert(message_id.to_string()) {
            return;
        }
        seen.order.push_back(message_id.to_string());
        while seen.order.len() > self.capacity {
            if let Some(oldest) = seen.order.pop_front() {
                seen.ids.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
