//! In-Memory Session Store Adapter
//!
//! Keeps sessions in a map keyed by user identifier.
//! Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::ConversationSession;
use crate::domain::foundation::UserIdentifier;
use crate::ports::{SessionStore, SessionStoreError};

/// In-memory session storage
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<UserIdentifier, ConversationSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session directly (useful for tests)
    pub async fn insert(&self, session: ConversationSession) {
        self.sessions
            .write()
            .await
            .insert(session.user_identifier().clone(), session);
    }

    /// Returns the stored session without creating one
    pub async fn get(&self, user: &UserIdentifier) -> Option<ConversationSession> {
        self.sessions.read().await.get(user).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user: &UserIdentifier) -> Result<ConversationSession, SessionStoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(user)
            .cloned()
            .unwrap_or_else(|| ConversationSession::new(user.clone())))
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_identifier().clone(), session.clone());
        Ok(())
    }
}
