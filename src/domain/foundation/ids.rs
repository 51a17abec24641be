//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Chat-level identifier of a person talking to the bot (phone number or chat id).
///
/// The identifier is the session key, so it is normalized on construction:
/// surrounding whitespace and a leading `+` are dropped. A blank identifier
/// is representable (transport payloads may omit the sender) but is never
/// dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentifier(String);

impl UserIdentifier {
    /// Creates a normalized identifier.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        Self(trimmed.strip_prefix('+').unwrap_or(trimmed).to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier carries no usable value.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserIdentifier {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Unique identifier for a registered marketplace user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random UserId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Declares a numeric marketplace entity identifier.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw numeric id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw numeric id.
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of an agreement between two marketplace users.
    AgreementId
);
entity_id!(
    /// Identifier of a seller's standing offer.
    OfferId
);
entity_id!(
    /// Identifier of a buyer's open product request.
    ProductRequestId
);
entity_id!(
    /// Identifier of a time-boxed flash deal.
    FlashDealId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_identifier_strips_plus_and_whitespace() {
        let id = UserIdentifier::new("  +6281234567890 ");
        assert_eq!(id.as_str(), "6281234567890");
    }

    #[test]
    fn user_identifier_blank_when_empty() {
        assert!(UserIdentifier::new("   ").is_blank());
        assert!(!UserIdentifier::new("123").is_blank());
    }

    #[test]
    fn user_identifier_serializes_as_plain_string() {
        let id = UserIdentifier::new("5511999");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"5511999\"");
    }

    #[test]
    fn user_id_round_trips_through_string() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn entity_ids_display_raw_value() {
        assert_eq!(AgreementId::new(42).to_string(), "42");
        assert_eq!(OfferId::new(7).value(), 7);
    }
}
