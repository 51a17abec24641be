//! File-based Session Store Adapter
//!
//! Stores one YAML document per user under a base directory. Writes go to a
//! temporary file first and are renamed into place, so a crash never leaves
//! a half-written session behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::conversation::ConversationSession;
use crate::domain::foundation::UserIdentifier;
use crate::ports::{SessionStore, SessionStoreError};

/// File-based session storage
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Create a new file store rooted at `base_path`
    ///
    /// # Example
    /// ```ignore
    /// let store = FileSessionStore::new("./data/sessions");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Session file for a user. Identifiers are reduced to a safe file name.
    fn session_file_path(&self, user: &UserIdentifier) -> PathBuf {
        let name: String = user
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.yaml", name))
    }

    async fn ensure_dir(&self) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, user: &UserIdentifier) -> Result<ConversationSession, SessionStoreError> {
        let file_path = self.session_file_path(user);

        let yaml = match fs::read_to_string(&file_path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConversationSession::new(user.clone()));
            }
            Err(e) => return Err(SessionStoreError::IoError(e.to_string())),
        };

        match serde_yaml::from_str::<ConversationSession>(&yaml) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!(
                    user = %user,
                    path = %file_path.display(),
                    error = %e,
                    "Discarding unreadable session file"
                );
                Ok(ConversationSession::new(user.clone()))
            }
        }
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError> {
        self.ensure_dir().await?;

        let file_path = self.session_file_path(session.user_identifier());
        let tmp_path = file_path.with_extension("yaml.tmp");

        let yaml = serde_yaml::to_string(session)
            .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;

        fs::write(&tmp_path, yaml)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;

        Ok(())
    }
}
