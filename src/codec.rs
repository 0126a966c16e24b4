//! Codec for the lesson-plan fields that are structured in memory but
//! persisted as a single text column.
//!
//! Decoding is deliberately total: corrupt or wrong-shaped text degrades to an
//! empty sequence with the parse error carried as a warning, so read paths
//! never fail on bad stored data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

/// A single labeled entry, e.g. one teaching objective or one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LabeledEntry {
    pub label: String,
    pub value: String,
}

/// One free-form step of a teaching process. Key order is preserved through
/// encode/decode (`serde_json` with `preserve_order`).
pub type FreeFormEntry = serde_json::Map<String, serde_json::Value>;

/// Result of a lenient decode: the items are always usable, and `warning`
/// holds the parse error when the input was malformed.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub warning: Option<String>,
}

impl<T> Decoded<T> {
    fn empty() -> Self {
        Decoded {
            items: Vec::new(),
            warning: None,
        }
    }
}

/// Serializes a sequence to its persisted text form. Never fails: an empty
/// sequence becomes `"[]"`, and a serializer error degrades to `"[]"` too.
pub fn encode<T: Serialize>(items: &[T]) -> String {
    match serde_json::to_string(items) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode structured field, storing empty list: {}", e);
            "[]".to_string()
        }
    }
}

/// Parses persisted text back into a typed sequence. Best-effort: this is not
/// an inverse of arbitrary text, only of `encode` output.
pub fn decode<T: DeserializeOwned>(text: &str) -> Decoded<T> {
    if text.trim().is_empty() {
        return Decoded::empty();
    }
    match serde_json::from_str::<Vec<T>>(text) {
        Ok(items) => Decoded {
            items,
            warning: None,
        },
        Err(e) => Decoded {
            items: Vec::new(),
            warning: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labeled_entries_round_trip() {
        let objectives = vec![LabeledEntry {
            label: "掌握加法".to_string(),
            value: "理解".to_string(),
        }];
        let encoded = encode(&objectives);
        let decoded = decode::<LabeledEntry>(&encoded);
        assert_eq!(decoded.items, objectives);
        assert!(decoded.warning.is_none());
    }

    #[test]
    fn string_lists_round_trip() {
        let key_points = vec!["进位的处理".to_string(), "竖式书写".to_string()];
        let decoded = decode::<String>(&encode(&key_points));
        assert_eq!(decoded.items, key_points);
    }

    #[test]
    fn free_form_entries_keep_key_order() {
        let mut step = FreeFormEntry::new();
        step.insert("stage".to_string(), json!("导入"));
        step.insert("duration".to_string(), json!(5));
        step.insert("activity".to_string(), json!("复习旧知"));
        let encoded = encode(&[step.clone()]);
        assert_eq!(encoded, r#"[{"stage":"导入","duration":5,"activity":"复习旧知"}]"#);
        let decoded = decode::<FreeFormEntry>(&encoded);
        assert_eq!(decoded.items, vec![step]);
    }

    #[test]
    fn empty_sequence_encodes_and_decodes_to_empty() {
        let encoded = encode::<String>(&[]);
        assert_eq!(encoded, "[]");
        let decoded = decode::<String>(&encoded);
        assert!(decoded.items.is_empty());
        assert!(decoded.warning.is_none());
    }

    #[test]
    fn garbage_decodes_to_empty_with_warning() {
        let decoded = decode::<String>("not-json-garbage");
        assert!(decoded.items.is_empty());
        assert!(decoded.warning.is_some());
    }

    #[test]
    fn truncated_input_decodes_to_empty_with_warning() {
        let decoded = decode::<LabeledEntry>(r#"[{"label":"掌握加法","val"#);
        assert!(decoded.items.is_empty());
        assert!(decoded.warning.is_some());
    }

    #[test]
    fn wrong_element_types_decode_to_empty_with_warning() {
        let decoded = decode::<String>("[1, 2, 3]");
        assert!(decoded.items.is_empty());
        assert!(decoded.warning.is_some());
    }

    #[test]
    fn wrong_shape_decodes_to_empty_with_warning() {
        // An object where a list is expected.
        let decoded = decode::<String>(r#"{"a": 1}"#);
        assert!(decoded.items.is_empty());
        assert!(decoded.warning.is_some());
    }

    #[test]
    fn blank_text_decodes_to_empty_without_warning() {
        let decoded = decode::<LabeledEntry>("   ");
        assert!(decoded.items.is_empty());
        assert!(decoded.warning.is_none());
    }
}
