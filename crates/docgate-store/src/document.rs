//! Document and filter types.
//!
//! A [`Document`] is an open-schema, insertion-ordered JSON object.  The
//! only key the store interprets is [`ID_FIELD`], which always leaves the
//! store as a string.
//!
//! A [`Filter`] is a Mongo-style predicate document.  It is built either
//! from raw JSON received at the API boundary or programmatically through
//! the small builder methods below.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Reserved key holding the store-assigned document identifier.
pub const ID_FIELD: &str = "_id";

/// One stored document.
pub type Document = Map<String, Value>;

/// Convert an arbitrary JSON value into a [`Document`].
///
/// Only JSON objects are accepted.
pub fn document_from_value(value: Value) -> StoreResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidArgument(format!(
            "document must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Render the `_id` of a document as the string used at the boundary.
///
/// Strings are kept verbatim; numbers are formatted.  Other JSON types are
/// not valid identifiers.
pub fn id_to_string(value: &Value) -> StoreResult<String> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(StoreError::InvalidArgument(format!(
            "`_id` must be a non-empty string or a number, got {}",
            json_type_name(other)
        ))),
    }
}

/// Human-readable name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Filter
// ═══════════════════════════════════════════════════════════════════════

/// A query predicate over documents.
///
/// The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// The match-everything filter.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a filter from raw JSON.  `null` is treated as the empty filter.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::InvalidFilter(format!(
                "filter must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Add an equality (or operator) condition on `field`.
    pub fn with(mut self, field: impl Into<String>, condition: impl Into<Value>) -> Self {
        self.0.insert(field.into(), condition.into());
        self
    }

    /// Add every condition of `other`; its fields replace ours on conflict.
    pub fn and(mut self, other: Filter) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Build a filter that matches when any of `branches` matches.
    pub fn any_of(branches: impl IntoIterator<Item = Filter>) -> Self {
        let branches: Vec<Value> = branches
            .into_iter()
            .map(|f| Value::Object(f.0))
            .collect();
        Self::empty().with("$or", Value::Array(branches))
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying condition map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the filter into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_appends_conditions_in_order() {
        let filter = Filter::empty()
            .with("department", "Sales")
            .and(Filter::empty().with("city", "Pune").with("department", "HR"));
        assert_eq!(filter.into_value(), json!({"department": "HR", "city": "Pune"}));
    }

    #[test]
    fn filter_serializes_transparently() {
        let filter = Filter::empty().with("name", "Rohan").with("salary", json!({"$gt": 10}));
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value, json!({"name": "Rohan", "salary": {"$gt": 10}}));
    }

    #[test]
    fn null_filter_is_empty() {
        let filter = Filter::from_value(Value::Null).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn non_object_filter_is_rejected() {
        let err = Filter::from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn any_of_wraps_branches_in_or() {
        let filter = Filter::any_of([
            Filter::empty().with("a", 1),
            Filter::empty().with("b", 2),
        ]);
        assert_eq!(filter.into_value(), json!({"$or": [{"a": 1}, {"b": 2}]}));
    }

    #[test]
    fn id_to_string_accepts_strings_and_numbers() {
        assert_eq!(id_to_string(&json!("abc")).unwrap(), "abc");
        assert_eq!(id_to_string(&json!(42)).unwrap(), "42");
        assert!(id_to_string(&json!("")).is_err());
        assert!(id_to_string(&json!({"oid": 1})).is_err());
    }

    #[test]
    fn document_from_value_requires_object() {
        assert!(document_from_value(json!({"name": "x"})).is_ok());
        assert!(document_from_value(json!("x")).is_err());
    }
}
