//! Session Store Port - Interface for persisting conversation sessions.
//!
//! This port defines how per-user sessions are loaded and saved. Callers
//! serialize read-modify-write per user identifier; the store itself only
//! guarantees that a single `save` is atomic for that user.

use async_trait::async_trait;

use crate::domain::conversation::ConversationSession;
use crate::domain::foundation::UserIdentifier;

/// Errors that can occur during session storage operations
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Failed to serialize session: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Session storage unavailable: {0}")]
    Unavailable(String),
}

/// Port for persisting and loading conversation sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for a user
    ///
    /// A user seen for the first time gets a fresh idle session; an absent
    /// session is never an error.
    ///
    /// # Errors
    /// Returns `SessionStoreError` only when the backing storage fails
    async fn load(&self, user: &UserIdentifier) -> Result<ConversationSession, SessionStoreError>;

    /// Save all fields of a session atomically
    ///
    /// # Errors
    /// Returns `SessionStoreError` if the write fails
    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError>;
}
