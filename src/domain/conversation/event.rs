//! Normalized inbound events.
//!
//! Every transport message is classified into an [`IncomingEvent`] before it
//! reaches the router. Events are immutable and every accessor is total: a
//! payload that does not carry the requested datum yields `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::UserIdentifier;

/// Tag of an event's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    ButtonReply,
    ListReply,
    Image,
    Document,
    Location,
    Unrecognized,
}

impl EventKind {
    /// Returns a short human label, used in notices.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Text => "text message",
            EventKind::ButtonReply => "button",
            EventKind::ListReply => "list option",
            EventKind::Image => "image",
            EventKind::Document => "document",
            EventKind::Location => "location",
            EventKind::Unrecognized => "message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific payload of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Text {
        body: String,
    },
    ButtonReply {
        id: String,
        title: String,
    },
    ListReply {
        id: String,
        title: String,
        #[serde(default)]
        description: Option<String>,
    },
    Image {
        media_id: String,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
    },
    Document {
        media_id: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        address: Option<String>,
    },
    /// Anything the classifier could not map; handlers treat it as invalid input.
    Unrecognized {
        raw_type: String,
    },
}

/// One inbound transport message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingEvent {
    sender: UserIdentifier,
    #[serde(default)]
    message_id: Option<String>,
    payload: EventPayload,
}

impl IncomingEvent {
    pub fn new(sender: UserIdentifier, payload: EventPayload) -> Self {
        Self {
            sender,
            message_id: None,
            payload,
        }
    }

    /// Attaches the transport's message id (for log correlation).
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn text(sender: impl AsRef<str>, body: impl Into<String>) -> Self {
        Self::new(UserIdentifier::new(sender), EventPayload::Text { body: body.into() })
    }

    pub fn button_reply(sender: impl AsRef<str>, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(
            UserIdentifier::new(sender),
            EventPayload::ButtonReply {
                id: id.into(),
                title: title.into(),
            },
        )
    }

    pub fn list_reply(sender: impl AsRef<str>, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(
            UserIdentifier::new(sender),
            EventPayload::ListReply {
                id: id.into(),
                title: title.into(),
                description: None,
            },
        )
    }

    pub fn image(sender: impl AsRef<str>, media_id: impl Into<String>) -> Self {
        Self::new(
            UserIdentifier::new(sender),
            EventPayload::Image {
                media_id: media_id.into(),
                caption: None,
                mime_type: None,
            },
        )
    }

    pub fn location(sender: impl AsRef<str>, latitude: f64, longitude: f64) -> Self {
        Self::new(
            UserIdentifier::new(sender),
            EventPayload::Location {
                latitude,
                longitude,
                name: None,
                address: None,
            },
        )
    }

    pub fn sender(&self) -> &UserIdentifier {
        &self.sender
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Text { .. } => EventKind::Text,
            EventPayload::ButtonReply { .. } => EventKind::ButtonReply,
            EventPayload::ListReply { .. } => EventKind::ListReply,
            EventPayload::Image { .. } => EventKind::Image,
            EventPayload::Document { .. } => EventKind::Document,
            EventPayload::Location { .. } => EventKind::Location,
            EventPayload::Unrecognized { .. } => EventKind::Unrecognized,
        }
    }

    /// Trimmed text content of a text message; `None` for other kinds or blank text.
    pub fn text_content(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Text { body } => non_blank(body),
            _ => None,
        }
    }

    /// Selected id of a button or list reply.
    pub fn selection_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::ButtonReply { id, .. } | EventPayload::ListReply { id, .. } => {
                non_blank(id)
            }
            _ => None,
        }
    }

    /// Display title of a button or list reply.
    pub fn selection_title(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::ButtonReply { title, .. } | EventPayload::ListReply { title, .. } => {
                non_blank(title)
            }
            _ => None,
        }
    }

    /// Coordinates of a location message, if finite and in range.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match &self.payload {
            EventPayload::Location {
                latitude,
                longitude,
                ..
            } if latitude.is_finite()
                && longitude.is_finite()
                && (-90.0..=90.0).contains(latitude)
                && (-180.0..=180.0).contains(longitude) =>
            {
                Some((*latitude, *longitude))
            }
            _ => None,
        }
    }

    /// Media reference of an image or document.
    pub fn media_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Image { media_id, .. } | EventPayload::Document { media_id, .. } => {
                non_blank(media_id)
            }
            _ => None,
        }
    }

    /// Returns true for button and list replies.
    pub fn is_selection(&self) -> bool {
        matches!(self.kind(), EventKind::ButtonReply | EventKind::ListReply)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
