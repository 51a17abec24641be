//! Session configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;
use crate::application::RouterConfig;

/// Where conversation sessions are kept
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Process memory; lost on restart
    Memory,
    /// One YAML file per user
    #[default]
    File,
}

/// Session and dispatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds of inactivity before an active flow is abandoned (0 disables)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Longest chain of flow handoffs followed for one message
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: usize,

    /// Session store backend
    #[serde(default)]
    pub backend: SessionBackend,

    /// Directory of the file store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl SessionConfig {
    /// Router tuning derived from this section
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            idle_timeout_secs: self.idle_timeout_secs,
            max_handoffs: self.max_handoffs,
        }
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_handoffs == 0 || self.max_handoffs > 16 {
            return Err(ValidationError::InvalidHandoffLimit);
        }
        if self.backend == SessionBackend::File && self.store_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyStorePath);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            max_handoffs: default_max_handoffs(),
            backend: SessionBackend::default(),
            store_path: default_store_path(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    1_800
}

fn default_max_handoffs() -> usize {
    4
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/sessions")
}
