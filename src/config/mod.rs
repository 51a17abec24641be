//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `MARKETPLACE_BOT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use marketplace_bot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod error;
mod server;
mod session;
mod whatsapp;

pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use session::{SessionBackend, SessionConfig};
pub use whatsapp::WhatsAppConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Session store and dispatch tuning
    #[serde(default)]
    pub session: SessionConfig,

    /// WhatsApp Cloud API credentials
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `MARKETPLACE_BOT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `MARKETPLACE_BOT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `MARKETPLACE_BOT__SESSION__IDLE_TIMEOUT_SECS=600` -> `session.idle_timeout_secs = 600`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MARKETPLACE_BOT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.session.validate()?;
        self.whatsapp.validate(&self.server.environment)?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MARKETPLACE_BOT__WHATSAPP__VERIFY_TOKEN",
        "MARKETPLACE_BOT__WHATSAPP__ACCESS_TOKEN",
        "MARKETPLACE_BOT__WHATSAPP__PHONE_NUMBER_ID",
        "MARKETPLACE_BOT__WHATSAPP__APP_SECRET",
        "MARKETPLACE_BOT__SERVER__PORT",
        "MARKETPLACE_BOT__SERVER__ENVIRONMENT",
        "MARKETPLACE_BOT__SESSION__IDLE_TIMEOUT_SECS",
        "MARKETPLACE_BOT__SESSION__BACKEND",
    ];

    fn set_minimal_env() {
        env::set_var("MARKETPLACE_BOT__WHATSAPP__VERIFY_TOKEN", "verify-me");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.whatsapp.verify_token, "verify-me");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.idle_timeout_secs, 1_800);
        assert_eq!(config.session.backend, SessionBackend::File);
        assert!(!config.whatsapp.is_live());
    }

    #[test]
    fn test_session_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MARKETPLACE_BOT__SESSION__IDLE_TIMEOUT_SECS", "600");
        env::set_var("MARKETPLACE_BOT__SESSION__BACKEND", "memory");
        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.session.idle_timeout_secs, 600);
        assert_eq!(config.session.backend, SessionBackend::Memory);
    }

    #[test]
    fn test_production_requires_credentials() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MARKETPLACE_BOT__SERVER__ENVIRONMENT", "production");
        let config = AppConfig::load().unwrap();
        clear_env();

        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MARKETPLACE_BOT__SERVER__PORT", "3000");
        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.server.port, 3000);
    }
}
