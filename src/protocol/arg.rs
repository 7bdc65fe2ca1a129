//! Event argument values.
//!
//! Arguments are JSON-compatible values that may also contain binary
//! attachments. On the wire each attachment travels as its own frame and
//! is replaced inline by a placeholder object:
//!
//! ```json
//! {"_placeholder": true, "num": 0}
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Key flagging an object as a placeholder.
const PLACEHOLDER_KEY: &str = "_placeholder";

/// Key holding a placeholder's attachment index.
const PLACEHOLDER_INDEX_KEY: &str = "num";

// ============================================================================
// Arg
// ============================================================================

/// One event argument.
///
/// Plain JSON subtrees are kept as [`Value`]; sequences and mappings are
/// only broken out into [`Arg::Array`] / [`Arg::Object`] when they hold a
/// binary attachment somewhere below them.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A JSON value with no binary content.
    Json(Value),
    /// A binary attachment.
    Binary(Vec<u8>),
    /// A sequence that may contain binary attachments.
    Array(Vec<Arg>),
    /// A mapping that may contain binary attachments.
    Object(BTreeMap<String, Arg>),
}

// ============================================================================
// Arg - Inspection
// ============================================================================

impl Arg {
    /// Returns `true` if this argument is or contains a binary attachment.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        match self {
            Self::Json(_) => false,
            Self::Binary(_) => true,
            Self::Array(items) => items.iter().any(Self::is_binary),
            Self::Object(entries) => entries.values().any(Self::is_binary),
        }
    }

    /// Returns the JSON value, if this is a plain JSON argument.
    #[inline]
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the string, if this is a JSON string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    /// Returns the unsigned integer, if this is a JSON number that fits.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.as_json().and_then(Value::as_u64)
    }

    /// Returns the signed integer, if this is a JSON number that fits.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(Value::as_i64)
    }

    /// Returns the boolean, if this is a JSON boolean.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_json().and_then(Value::as_bool)
    }

    /// Extracts raw bytes from a data argument.
    ///
    /// Accepts a binary attachment, a JSON string (its UTF-8 bytes) or a
    /// JSON array of byte values.
    #[must_use]
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Binary(bytes) => Some(bytes.clone()),
            Self::Json(Value::String(text)) => Some(text.as_bytes().to_vec()),
            Self::Json(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect(),
            _ => None,
        }
    }
}

// ============================================================================
// Arg - Placeholder Deconstruction
// ============================================================================

impl Arg {
    /// Replaces every binary attachment with a placeholder.
    ///
    /// Attachments are appended to `attachments` in traversal order and
    /// numbered from the current length of `attachments`.
    #[must_use]
    pub fn deconstruct(self, attachments: &mut Vec<Vec<u8>>) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Binary(bytes) => {
                let index = attachments.len();
                attachments.push(bytes);
                placeholder(index)
            }
            Self::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| item.deconstruct(attachments))
                    .collect(),
            ),
            Self::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, item.deconstruct(attachments)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Substitutes attachments back into placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAttachment`] if a placeholder index has no
    /// matching attachment.
    pub fn reconstruct(value: Value, attachments: &[Vec<u8>]) -> Result<Self> {
        if !contains_placeholder(&value) {
            return Ok(Self::Json(value));
        }

        if let Some(index) = placeholder_index(&value) {
            let bytes = attachments
                .get(index)
                .ok_or_else(|| Error::missing_attachment(index, attachments.len()))?;
            return Ok(Self::Binary(bytes.clone()));
        }

        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| Self::reconstruct(item, attachments))
                .collect::<Result<Vec<_>>>()
                .map(Self::Array),
            Value::Object(entries) => entries
                .into_iter()
                .map(|(key, item)| Ok((key, Self::reconstruct(item, attachments)?)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Self::Object),
            other => Ok(Self::Json(other)),
        }
    }
}

// ============================================================================
// Placeholder Helpers
// ============================================================================

/// Builds a placeholder object for attachment `index`.
#[inline]
#[must_use]
pub fn placeholder(index: usize) -> Value {
    let mut object = Map::new();
    object.insert(PLACEHOLDER_KEY.to_string(), Value::Bool(true));
    object.insert(PLACEHOLDER_INDEX_KEY.to_string(), Value::from(index));
    Value::Object(object)
}

/// Returns the attachment index if `value` is a placeholder object.
#[must_use]
pub fn placeholder_index(value: &Value) -> Option<usize> {
    let object = value.as_object()?;
    if object.get(PLACEHOLDER_KEY).and_then(Value::as_bool) != Some(true) {
        return None;
    }
    object
        .get(PLACEHOLDER_INDEX_KEY)
        .and_then(Value::as_u64)
        .and_then(|index| usize::try_from(index).ok())
}

/// Returns `true` if `value` is or contains a placeholder.
#[must_use]
pub fn contains_placeholder(value: &Value) -> bool {
    if placeholder_index(value).is_some() {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(contains_placeholder),
        Value::Object(entries) => entries.values().any(contains_placeholder),
        _ => false,
    }
}

/// Collects placeholder indices in traversal order.
pub fn collect_placeholders(value: &Value, indices: &mut Vec<usize>) {
    if let Some(index) = placeholder_index(value) {
        indices.push(index);
        return;
    }
    match value {
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_placeholders(item, indices)),
        Value::Object(entries) => entries
            .values()
            .for_each(|item| collect_placeholders(item, indices)),
        _ => {}
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Value> for Arg {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for Arg {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Arg {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<&str> for Arg {
    #[inline]
    fn from(text: &str) -> Self {
        Self::Json(Value::from(text))
    }
}

impl From<String> for Arg {
    #[inline]
    fn from(text: String) -> Self {
        Self::Json(Value::from(text))
    }
}

impl From<bool> for Arg {
    #[inline]
    fn from(flag: bool) -> Self {
        Self::Json(Value::from(flag))
    }
}

impl From<u64> for Arg {
    #[inline]
    fn from(number: u64) -> Self {
        Self::Json(Value::from(number))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_binary_detection_nested() {
        assert!(!Arg::from("text").is_binary());
        assert!(Arg::from(vec![1u8, 2]).is_binary());

        let nested = Arg::Array(vec![
            Arg::from("a"),
            Arg::Object(BTreeMap::from([(
                "blob".to_string(),
                Arg::from(vec![0xFFu8]),
            )])),
        ]);
        assert!(nested.is_binary());

        let plain = Arg::Array(vec![Arg::from("a"), Arg::from(1u64)]);
        assert!(!plain.is_binary());
    }

    #[test]
    fn test_deconstruct_preserves_structure() {
        let arg = Arg::Object(BTreeMap::from([
            ("name".to_string(), Arg::from("battery")),
            (
                "chunks".to_string(),
                Arg::Array(vec![Arg::from(vec![1u8]), Arg::from(vec![2u8])]),
            ),
        ]));

        let mut attachments = Vec::new();
        let value = arg.deconstruct(&mut attachments);

        assert_eq!(attachments, vec![vec![1u8], vec![2u8]]);
        assert_eq!(
            value,
            json!({
                "name": "battery",
                "chunks": [
                    {"_placeholder": true, "num": 0},
                    {"_placeholder": true, "num": 1}
                ]
            })
        );
    }

    #[test]
    fn test_reconstruct_round_trip() {
        let original = Arg::Array(vec![Arg::from("180f"), Arg::from(vec![0x64u8])]);

        let mut attachments = Vec::new();
        let value = original.clone().deconstruct(&mut attachments);
        let rebuilt = Arg::reconstruct(value, &attachments).expect("reconstruct");

        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_reconstruct_missing_attachment() {
        let value = json!([{"_placeholder": true, "num": 3}]);
        let err = Arg::reconstruct(value, &[vec![1]]).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAttachment {
                index: 3,
                received: 1
            }
        ));
    }

    #[test]
    fn test_placeholder_detection() {
        assert_eq!(placeholder_index(&placeholder(4)), Some(4));
        assert_eq!(placeholder_index(&json!({"_placeholder": false, "num": 1})), None);
        assert_eq!(placeholder_index(&json!({"num": 1})), None);

        let mut indices = Vec::new();
        collect_placeholders(&json!([placeholder(0), {"x": placeholder(1)}]), &mut indices);
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(Arg::from(vec![1u8, 2]).to_bytes(), Some(vec![1, 2]));
        assert_eq!(Arg::from("dA").to_bytes(), Some(b"dA".to_vec()));
        assert_eq!(Arg::Json(json!([100, 0])).to_bytes(), Some(vec![100, 0]));
        assert_eq!(Arg::Json(json!([300])).to_bytes(), None);
        assert_eq!(Arg::Json(json!(null)).to_bytes(), None);
    }
}
