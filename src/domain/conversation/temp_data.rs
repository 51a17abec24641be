//! Flow-scoped temporary data.
//!
//! Sessions persist temp data as a generic JSON object so that the store stays
//! flow-agnostic. Handlers never touch the bag directly: each flow declares a
//! typed struct implementing [`FlowData`] and converts at the session boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::errors::TempDataError;

/// The persisted temp-data bag.
pub type TempData = serde_json::Map<String, Value>;

/// Typed view over a flow's temp data.
///
/// Fields should be optional or defaulted so that a partially-filled bag
/// (a flow interrupted half-way) still decodes.
pub trait FlowData: Serialize + DeserializeOwned + Default {
    /// Decodes the typed view from the bag.
    fn from_bag(bag: &TempData) -> Result<Self, TempDataError> {
        serde_json::from_value(Value::Object(bag.clone()))
            .map_err(|e| TempDataError::Decode(e.to_string()))
    }

    /// Encodes the typed view into a fresh bag.
    fn to_bag(&self) -> Result<TempData, TempDataError> {
        match serde_json::to_value(self).map_err(|e| TempDataError::Encode(e.to_string()))? {
            Value::Object(map) => Ok(map),
            _ => Err(TempDataError::NotAnObject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct DraftData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<u32>,
    }

    impl FlowData for DraftData {}

    #[test]
    fn empty_bag_decodes_to_default() {
        let data = DraftData::from_bag(&TempData::new()).unwrap();
        assert_eq!(data, DraftData::default());
    }

    #[test]
    fn encoded_bag_omits_unset_fields() {
        let data = DraftData {
            title: Some("Mangoes".to_string()),
            quantity: None,
        };
        let bag = data.to_bag().unwrap();
        assert_eq!(bag.get("title"), Some(&json!("Mangoes")));
        assert!(!bag.contains_key("quantity"));
    }

    #[test]
    fn mistyped_field_fails_to_decode() {
        let mut bag = TempData::new();
        bag.insert("quantity".to_string(), json!("many"));
        assert!(matches!(
            DraftData::from_bag(&bag),
            Err(TempDataError::Decode(_))
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut bag = TempData::new();
        bag.insert("leftover".to_string(), json!(true));
        bag.insert("quantity".to_string(), json!(3));
        let data = DraftData::from_bag(&bag).unwrap();
        assert_eq!(data.quantity, Some(3));
    }
}
