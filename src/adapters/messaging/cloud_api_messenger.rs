//! WhatsApp Cloud API Messenger - Implementation of Messenger over HTTP.
//!
//! # Configuration
//!
//! ```ignore
//! let config = CloudApiConfig::new(access_token, phone_number_id)
//!     .with_base_url("https://graph.facebook.com/v19.0")
//!     .with_timeout(Duration::from_secs(10));
//!
//! let messenger = CloudApiMessenger::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::foundation::UserIdentifier;
use crate::ports::{
    Button, ListSection, MediaSource, MessageReceipt, Messenger, MessagingError, OutboundMessage,
};

/// Configuration for the Cloud API messenger.
#[derive(Debug, Clone)]
pub struct CloudApiConfig {
    access_token: Secret<String>,
    /// Sending phone number id.
    pub phone_number_id: String,
    /// Graph API base URL, including the version.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl CloudApiConfig {
    pub fn new(access_token: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            phone_number_id: phone_number_id.into(),
            base_url: "https://graph.facebook.com/v19.0".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentId>,
}

#[derive(Debug, Deserialize)]
struct SentId {
    id: String,
}

/// Cloud API messenger.
pub struct CloudApiMessenger {
    config: CloudApiConfig,
    client: Client,
}

impl CloudApiMessenger {
    /// Creates a messenger with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Transport` if the HTTP client cannot be built.
    pub fn new(config: CloudApiConfig) -> Result<Self, MessagingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MessagingError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.config.base_url, self.config.phone_number_id)
    }

    fn map_send_error(&self, e: reqwest::Error) -> MessagingError {
        if e.is_timeout() {
            MessagingError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if e.is_connect() {
            MessagingError::Transport(format!("Connection failed: {}", e))
        } else {
            MessagingError::Transport(e.to_string())
        }
    }
}

/// Builds the Cloud API request body for a message.
pub(crate) fn to_cloud_payload(to: &UserIdentifier, message: &OutboundMessage) -> Value {
    let (kind, content) = match message {
        OutboundMessage::Text { body } => ("text", json!({ "body": body, "preview_url": false })),
        OutboundMessage::Buttons {
            body,
            buttons,
            header,
            footer,
        } => (
            "interactive",
            interactive("button", body, header, footer, buttons_action(buttons)),
        ),
        OutboundMessage::List {
            body,
            button_text,
            sections,
            header,
            footer,
        } => (
            "interactive",
            interactive("list", body, header, footer, list_action(button_text, sections)),
        ),
        OutboundMessage::Image { media, caption } => {
            let mut image = media_object(media);
            if let Some(caption) = caption {
                image["caption"] = json!(caption);
            }
            ("image", image)
        }
        OutboundMessage::Document {
            media,
            filename,
            caption,
        } => {
            let mut document = media_object(media);
            if let Some(filename) = filename {
                document["filename"] = json!(filename);
            }
            if let Some(caption) = caption {
                document["caption"] = json!(caption);
            }
            ("document", document)
        }
        OutboundMessage::Location {
            latitude,
            longitude,
            name,
            address,
        } => {
            let mut location = json!({ "latitude": latitude, "longitude": longitude });
            if let Some(name) = name {
                location["name"] = json!(name);
            }
            if let Some(address) = address {
                location["address"] = json!(address);
            }
            ("location", location)
        }
        OutboundMessage::LocationRequest { body } => (
            "interactive",
            interactive(
                "location_request_message",
                body,
                &None,
                &None,
                json!({ "name": "send_location" }),
            ),
        ),
    };

    let mut payload = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to.as_str(),
        "type": kind,
    });
    payload[kind] = content;
    payload
}

fn interactive(
    kind: &str,
    body: &str,
    header: &Option<String>,
    footer: &Option<String>,
    action: Value,
) -> Value {
    let mut value = json!({
        "type": kind,
        "body": { "text": body },
        "action": action,
    });
    if let Some(header) = header {
        value["header"] = json!({ "type": "text", "text": header });
    }
    if let Some(footer) = footer {
        value["footer"] = json!({ "text": footer });
    }
    value
}

fn buttons_action(buttons: &[Button]) -> Value {
    let buttons: Vec<Value> = buttons
        .iter()
        .map(|b| json!({ "type": "reply", "reply": { "id": b.id, "title": b.title } }))
        .collect();
    json!({ "buttons": buttons })
}

fn list_action(button_text: &str, sections: &[ListSection]) -> Value {
    let sections: Vec<Value> = sections
        .iter()
        .map(|section| {
            let rows: Vec<Value> = section
                .rows
                .iter()
                .map(|row| {
                    let mut value = json!({ "id": row.id, "title": row.title });
                    if let Some(description) = &row.description {
                        value["description"] = json!(description);
                    }
                    value
                })
                .collect();
            json!({ "title": section.title, "rows": rows })
        })
        .collect();
    json!({ "button": button_text, "sections": sections })
}

fn media_object(media: &MediaSource) -> Value {
    match media {
        MediaSource::Id(id) => json!({ "id": id }),
        MediaSource::Link(link) => json!({ "link": link }),
    }
}

#[async_trait]
impl Messenger for CloudApiMessenger {
    async fn send(
        &self,
        to: &UserIdentifier,
        message: OutboundMessage,
    ) -> Result<MessageReceipt, MessagingError> {
        if to.is_blank() {
            return Err(MessagingError::InvalidRecipient(to.to_string()));
        }

        let payload = to_cloud_payload(to, &message);
        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.config.access_token())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(
                user = %to,
                status = status.as_u16(),
                "Cloud API rejected message"
            );
            return Err(MessagingError::Rejected {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| MessagingError::Transport(format!("Unreadable response: {}", e)))?;

        let message_id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| MessagingError::Transport("Response carried no message id".to_string()))?;

        tracing::debug!(user = %to, message_id = %message_id, "Message sent");
        Ok(MessageReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ListRow;

    fn user() -> UserIdentifier {
        UserIdentifier::new("628111")
    }

    #[test]
    fn config_builder_works() {
        let config = CloudApiConfig::new("token", "1234")
            .with_base_url("http://localhost:9999")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.access_token(), "token");
    }

    #[test]
    fn messages_url_includes_phone_number_id() {
        let messenger = CloudApiMessenger::new(
            CloudApiConfig::new("token", "1234").with_base_url("http://graph.test/v19.0"),
        )
        .unwrap();

        assert_eq!(messenger.messages_url(), "http://graph.test/v19.0/1234/messages");
    }

    #[test]
    fn text_payload_shape() {
        let payload = to_cloud_payload(&user(), &OutboundMessage::Text { body: "hi".to_string() });

        assert_eq!(payload["type"], "text");
        assert_eq!(payload["to"], "628111");
        assert_eq!(payload["text"]["body"], "hi");
    }

    #[test]
    fn buttons_payload_uses_reply_buttons() {
        let message = OutboundMessage::Buttons {
            body: "Confirm?".to_string(),
            buttons: vec![Button::new("confirm_yes", "Confirm")],
            header: None,
            footer: Some("footer".to_string()),
        };

        let payload = to_cloud_payload(&user(), &message);

        assert_eq!(payload["interactive"]["type"], "button");
        assert_eq!(
            payload["interactive"]["action"]["buttons"][0]["reply"]["id"],
            "confirm_yes"
        );
        assert_eq!(payload["interactive"]["footer"]["text"], "footer");
        assert!(payload["interactive"].get("header").is_none());
    }

    #[test]
    fn list_payload_carries_sections() {
        let message = OutboundMessage::List {
            body: "Pick".to_string(),
            button_text: "Menu".to_string(),
            sections: vec![ListSection::new(
                "Main",
                vec![ListRow::new("offer_manage", "My offers").with_description("Manage")],
            )],
            header: None,
            footer: None,
        };

        let payload = to_cloud_payload(&user(), &message);

        let action = &payload["interactive"]["action"];
        assert_eq!(action["button"], "Menu");
        assert_eq!(action["sections"][0]["rows"][0]["id"], "offer_manage");
        assert_eq!(action["sections"][0]["rows"][0]["description"], "Manage");
    }

    #[test]
    fn location_request_payload() {
        let payload = to_cloud_payload(
            &user(),
            &OutboundMessage::LocationRequest {
                body: "Where?".to_string(),
            },
        );

        assert_eq!(payload["interactive"]["type"], "location_request_message");
        assert_eq!(payload["interactive"]["action"]["name"], "send_location");
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let messenger = CloudApiMessenger::new(
            CloudApiConfig::new("token", "1234")
                .with_base_url("http://127.0.0.1:9")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let err = messenger.send_text(&user(), "hi").await.unwrap_err();

        assert!(matches!(
            err,
            MessagingError::Transport(_) | MessagingError::Timeout { .. }
        ));
    }
}
