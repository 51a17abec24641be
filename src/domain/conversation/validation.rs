//! Step input validation.
//!
//! A step that receives input it cannot accept returns an [`InvalidInput`]
//! value; the router hands it to the handler's `handle_invalid_input`, which
//! re-prompts. Validation never raises a collaborator error.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::foundation::ValidationError;

use super::event::{EventKind, IncomingEvent};

/// Input shapes a step can expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Text,
    Selection,
    Image,
    Location,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Expected::Text => "a text reply",
            Expected::Selection => "one of the options",
            Expected::Image => "a photo",
            Expected::Location => "a location",
        };
        f.write_str(label)
    }
}

/// Why a step rejected an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("Expected {expected}, got {got}")]
    WrongKind { expected: Expected, got: EventKind },

    #[error(transparent)]
    Field(#[from] ValidationError),

    #[error("Selection '{0}' is not offered at this step")]
    UnknownSelection(String),
}

impl InvalidInput {
    /// User-facing notice for this failure.
    pub fn notice(&self) -> String {
        match self {
            InvalidInput::WrongKind { expected, got } => {
                format!("Sorry, I can't use that {} here. Please send {}.", got, expected)
            }
            InvalidInput::Field(err) => field_notice(err),
            InvalidInput::UnknownSelection(_) => {
                "Sorry, that option isn't available here. Please pick one of the options below."
                    .to_string()
            }
        }
    }
}

fn field_notice(err: &ValidationError) -> String {
    match err {
        ValidationError::EmptyField { field } => format!("The {} can't be empty.", humanize(field)),
        ValidationError::OutOfRange { field, min, max, .. } => {
            format!("The {} must be between {} and {}.", humanize(field), min, max)
        }
        ValidationError::InvalidFormat { field, reason } => {
            format!("That {} doesn't look right: {}.", humanize(field), reason)
        }
    }
}

fn humanize(field: &str) -> String {
    field.replace('_', " ")
}

/// Requires a non-blank text message.
pub fn require_text(event: &IncomingEvent) -> Result<&str, InvalidInput> {
    event.text_content().ok_or(InvalidInput::WrongKind {
        expected: Expected::Text,
        got: event.kind(),
    })
}

/// Requires a button or list selection.
pub fn require_selection(event: &IncomingEvent) -> Result<&str, InvalidInput> {
    event.selection_id().ok_or(InvalidInput::WrongKind {
        expected: Expected::Selection,
        got: event.kind(),
    })
}

/// Requires a photo.
pub fn require_image(event: &IncomingEvent) -> Result<&str, InvalidInput> {
    match event.kind() {
        EventKind::Image => event.media_id().ok_or(InvalidInput::WrongKind {
            expected: Expected::Image,
            got: EventKind::Unrecognized,
        }),
        got => Err(InvalidInput::WrongKind {
            expected: Expected::Image,
            got,
        }),
    }
}

/// Requires a shared location with usable coordinates.
pub fn require_location(event: &IncomingEvent) -> Result<(f64, f64), InvalidInput> {
    event.coordinates().ok_or(InvalidInput::WrongKind {
        expected: Expected::Location,
        got: event.kind(),
    })
}

/// Validates a short free-text field.
pub fn parse_title(field: &str, text: &str, min_len: usize, max_len: usize) -> Result<String, ValidationError> {
    let value = text.trim();
    if value.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let len = value.chars().count();
    if len < min_len || len > max_len {
        return Err(ValidationError::invalid_format(
            field,
            format!("use {} to {} characters", min_len, max_len),
        ));
    }
    Ok(value.to_string())
}

/// Parses a money amount into minor units (cents).
///
/// Accepts an optional leading `$`, digits, and at most two decimals after
/// a `.`; the amount must be positive.
pub fn parse_amount_cents(field: &str, text: &str) -> Result<u64, ValidationError> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::empty_field(field));
    }

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) || fraction.len() > 2 {
        return Err(ValidationError::invalid_format(field, "send a number like 25 or 25.50"));
    }

    let whole: u64 = whole
        .parse()
        .map_err(|_| ValidationError::invalid_format(field, "the amount is too large"))?;
    let cents: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().unwrap_or(0) * 10,
        _ => fraction.parse::<u64>().unwrap_or(0),
    };
    let total = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(|| ValidationError::invalid_format(field, "the amount is too large"))?;

    if total == 0 {
        return Err(ValidationError::invalid_format(field, "the amount must be more than zero"));
    }
    Ok(total)
}

/// Parses a whole number within `min..=max`, allowing a trailing `%`.
pub fn parse_bounded(field: &str, text: &str, min: i64, max: i64) -> Result<i64, ValidationError> {
    let cleaned = text.trim().trim_end_matches('%').trim();
    if cleaned.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let value: i64 = cleaned
        .parse()
        .map_err(|_| ValidationError::invalid_format(field, "send a whole number"))?;
    if value < min || value > max {
        return Err(ValidationError::out_of_range(field, min, max, value));
    }
    Ok(value)
}

/// Normalizes a phone number to its digits (8 to 15 of them).
pub fn parse_phone(field: &str, text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let mut digits = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '+' | ' ' | '-' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::invalid_format(
                    field,
                    "use digits only, with an optional country code",
                ))
            }
        }
    }
    if !(8..=15).contains(&digits.len()) {
        return Err(ValidationError::invalid_format(field, "it should have 8 to 15 digits"));
    }
    Ok(digits)
}

/// Parses a date (`YYYY-MM-DD` or `DD/MM/YYYY`) that is not before `today`.
pub fn parse_future_date(field: &str, text: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| ValidationError::invalid_format(field, "use YYYY-MM-DD or DD/MM/YYYY"))?;
    if date < today {
        return Err(ValidationError::invalid_format(field, "the date is in the past"));
    }
    Ok(date)
}
