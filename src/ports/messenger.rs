//! Messenger Port - Interface for outbound chat messages.
//!
//! Every outbound message goes through [`Messenger::send`]; the convenience
//! methods build an [`OutboundMessage`] and delegate to it, so adapters only
//! implement one method.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserIdentifier;

/// Reply button (at most three per message on most transports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One selectable row of a list message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

impl ListRow {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Titled group of list rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

impl ListSection {
    pub fn new(title: impl Into<String>, rows: Vec<ListRow>) -> Self {
        Self {
            title: title.into(),
            rows,
        }
    }
}

/// Media to attach: an uploaded media id or a public link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Id(String),
    Link(String),
}

/// Every message shape the core can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Buttons {
        body: String,
        buttons: Vec<Button>,
        header: Option<String>,
        footer: Option<String>,
    },
    List {
        body: String,
        button_text: String,
        sections: Vec<ListSection>,
        header: Option<String>,
        footer: Option<String>,
    },
    Image {
        media: MediaSource,
        caption: Option<String>,
    },
    Document {
        media: MediaSource,
        filename: Option<String>,
        caption: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
        address: Option<String>,
    },
    LocationRequest {
        body: String,
    },
}

impl OutboundMessage {
    /// Main text of the message, if it has one.
    pub fn body(&self) -> Option<&str> {
        match self {
            OutboundMessage::Text { body }
            | OutboundMessage::Buttons { body, .. }
            | OutboundMessage::List { body, .. }
            | OutboundMessage::LocationRequest { body } => Some(body),
            OutboundMessage::Image { caption, .. } | OutboundMessage::Document { caption, .. } => {
                caption.as_deref()
            }
            OutboundMessage::Location { .. } => None,
        }
    }

    /// Ids of the buttons or list rows offered by the message.
    pub fn option_ids(&self) -> Vec<&str> {
        match self {
            OutboundMessage::Buttons { buttons, .. } => buttons.iter().map(|b| b.id.as_str()).collect(),
            OutboundMessage::List { sections, .. } => sections
                .iter()
                .flat_map(|s| s.rows.iter().map(|r| r.id.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Transport acknowledgement for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: String,
}

/// Errors returned by messaging adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Message rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Port for delivering outbound messages to a chat user.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    /// Returns `MessagingError` on transport failure or timeout; callers
    /// treat it as retriable.
    async fn send(
        &self,
        to: &UserIdentifier,
        message: OutboundMessage,
    ) -> Result<MessageReceipt, MessagingError>;

    async fn send_text(
        &self,
        to: &UserIdentifier,
        body: &str,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(to, OutboundMessage::Text { body: body.to_string() })
            .await
    }

    async fn send_buttons(
        &self,
        to: &UserIdentifier,
        body: &str,
        buttons: Vec<Button>,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(
            to,
            OutboundMessage::Buttons {
                body: body.to_string(),
                buttons,
                header: None,
                footer: None,
            },
        )
        .await
    }

    async fn send_list(
        &self,
        to: &UserIdentifier,
        body: &str,
        button_text: &str,
        sections: Vec<ListSection>,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(
            to,
            OutboundMessage::List {
                body: body.to_string(),
                button_text: button_text.to_string(),
                sections,
                header: None,
                footer: None,
            },
        )
        .await
    }

    async fn send_image(
        &self,
        to: &UserIdentifier,
        media: MediaSource,
        caption: Option<String>,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(to, OutboundMessage::Image { media, caption }).await
    }

    async fn send_document(
        &self,
        to: &UserIdentifier,
        media: MediaSource,
        filename: Option<String>,
        caption: Option<String>,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(
            to,
            OutboundMessage::Document {
                media,
                filename,
                caption,
            },
        )
        .await
    }

    async fn send_location(
        &self,
        to: &UserIdentifier,
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(
            to,
            OutboundMessage::Location {
                latitude,
                longitude,
                name,
                address: None,
            },
        )
        .await
    }

    async fn request_location(
        &self,
        to: &UserIdentifier,
        body: &str,
    ) -> Result<MessageReceipt, MessagingError> {
        self.send(to, OutboundMessage::LocationRequest { body: body.to_string() })
            .await
    }
}
