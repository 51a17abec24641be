//! WhatsApp Cloud API configuration

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::CloudApiConfig;

/// WhatsApp Cloud API configuration
///
/// Without an access token the bot runs against the recording messenger,
/// which only logs outbound messages.
#[derive(Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sending phone number id
    #[serde(default)]
    pub phone_number_id: String,

    /// App secret used to sign webhook deliveries
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed during the subscription handshake
    #[serde(default)]
    pub verify_token: String,

    /// Graph API base URL, including the version
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl WhatsAppConfig {
    /// Whether outbound messages go to the real API
    pub fn is_live(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Messenger settings, if an access token is configured
    pub fn cloud_api_config(&self) -> Option<CloudApiConfig> {
        let token = self.access_token.as_deref().filter(|t| !t.is_empty())?;
        Some(
            CloudApiConfig::new(token, self.phone_number_id.clone())
                .with_base_url(self.api_base_url.clone())
                .with_timeout(Duration::from_secs(self.request_timeout_secs)),
        )
    }

    /// Validate WhatsApp configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.verify_token.is_empty() {
            return Err(ValidationError::MissingRequired("WHATSAPP__VERIFY_TOKEN"));
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://")
        {
            return Err(ValidationError::InvalidApiBaseUrl);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.is_live() && self.phone_number_id.is_empty() {
            return Err(ValidationError::MissingRequired("WHATSAPP__PHONE_NUMBER_ID"));
        }
        if *environment == Environment::Production {
            if !self.is_live() {
                return Err(ValidationError::MissingRequired("WHATSAPP__ACCESS_TOKEN"));
            }
            if self.app_secret.as_deref().map_or(true, str::is_empty) {
                return Err(ValidationError::AppSecretRequired);
            }
        }
        Ok(())
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: String::new(),
            app_secret: None,
            verify_token: String::new(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("phone_number_id", &self.phone_number_id)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[REDACTED]"))
            .field("verify_token", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
