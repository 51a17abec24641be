//! WhatsApp Cloud API input classifier.
//!
//! Maps the message objects of a Cloud API webhook delivery
//! (`entry[].changes[].value.messages[]`) to [`IncomingEvent`]s. Never fails:
//! shapes it does not know degrade to text when some text can be found, and
//! to `Unrecognized` otherwise.

use serde_json::Value;

use crate::domain::conversation::{EventPayload, IncomingEvent};
use crate::domain::foundation::UserIdentifier;
use crate::ports::InputClassifier;

/// Classifier for WhatsApp Cloud API payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsAppClassifier;

impl WhatsAppClassifier {
    pub fn new() -> Self {
        Self
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coordinates arrive as numbers, occasionally as strings.
fn f64_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unrecognized(raw_type: &str) -> EventPayload {
    EventPayload::Unrecognized {
        raw_type: raw_type.to_string(),
    }
}

fn classify_interactive(interactive: &Value) -> EventPayload {
    let kind = interactive.get("type").and_then(Value::as_str).unwrap_or("");
    let reply = interactive.get(kind).unwrap_or(&Value::Null);

    match kind {
        "button_reply" => match (str_field(reply, "id"), str_field(reply, "title")) {
            (Some(id), title) => EventPayload::ButtonReply {
                title: title.unwrap_or_else(|| id.clone()),
                id,
            },
            (None, Some(title)) => EventPayload::Text { body: title },
            (None, None) => unrecognized("interactive.button_reply"),
        },
        "list_reply" => match (str_field(reply, "id"), str_field(reply, "title")) {
            (Some(id), title) => EventPayload::ListReply {
                title: title.unwrap_or_else(|| id.clone()),
                description: str_field(reply, "description"),
                id,
            },
            (None, Some(title)) => EventPayload::Text { body: title },
            (None, None) => unrecognized("interactive.list_reply"),
        },
        other => str_field(reply, "title")
            .or_else(|| str_field(reply, "body"))
            .map(|body| EventPayload::Text { body })
            .unwrap_or_else(|| unrecognized(&format!("interactive.{}", other))),
    }
}

fn classify_payload(message: &Value) -> EventPayload {
    let kind = message.get("type").and_then(Value::as_str).unwrap_or("");
    let content = message.get(kind).unwrap_or(&Value::Null);

    match kind {
        "text" => match str_field(content, "body") {
            Some(body) => EventPayload::Text { body },
            None => unrecognized("text"),
        },
        "interactive" => classify_interactive(content),
        // Quick-reply buttons of template messages.
        "button" => match (str_field(content, "payload"), str_field(content, "text")) {
            (Some(id), title) => EventPayload::ButtonReply {
                title: title.unwrap_or_else(|| id.clone()),
                id,
            },
            (None, Some(body)) => EventPayload::Text { body },
            (None, None) => unrecognized("button"),
        },
        "image" => match str_field(content, "id") {
            Some(media_id) => EventPayload::Image {
                media_id,
                caption: str_field(content, "caption"),
                mime_type: str_field(content, "mime_type"),
            },
            None => unrecognized("image"),
        },
        "document" => match str_field(content, "id") {
            Some(media_id) => EventPayload::Document {
                media_id,
                filename: str_field(content, "filename"),
                caption: str_field(content, "caption"),
                mime_type: str_field(content, "mime_type"),
            },
            None => unrecognized("document"),
        },
        "location" => match (f64_field(content, "latitude"), f64_field(content, "longitude")) {
            (Some(latitude), Some(longitude)) => EventPayload::Location {
                latitude,
                longitude,
                name: str_field(content, "name"),
                address: str_field(content, "address"),
            },
            _ => unrecognized("location"),
        },
        "" => unrecognized("missing"),
        other => str_field(content, "body")
            .or_else(|| str_field(content, "caption"))
            .map(|body| EventPayload::Text { body })
            .unwrap_or_else(|| unrecognized(other)),
    }
}

impl InputClassifier for WhatsAppClassifier {
    fn classify(&self, message: &Value) -> IncomingEvent {
        let sender = UserIdentifier::new(message.get("from").and_then(Value::as_str).unwrap_or(""));
        let event = IncomingEvent::new(sender, classify_payload(message));
        match str_field(message, "id") {
            Some(id) => event.with_message_id(id),
            None => event,
        }
    }

    fn classify_webhook(&self, payload: &Value) -> Vec<IncomingEvent> {
        let empty = Vec::new();
        let entries = payload
            .get("entry")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        entries
            .iter()
            .filter_map(|entry| entry.get("changes").and_then(Value::as_array))
            .flatten()
            .filter_map(|change| {
                change
                    .get("value")
                    .and_then(|value| value.get("messages"))
                    .and_then(Value::as_array)
            })
            .flatten()
            .map(|message| self.classify(message))
            .collect()
    }
}
