//! Update documents: `$set`, `$unset` and `$inc`.
//!
//! An update body without any `$`-prefixed top-level key is treated as a
//! plain field replacement and wrapped into `$set`.  Only the top level is
//! inspected; nested objects are stored as given.

use serde_json::{Map, Value};

use crate::document::{Document, ID_FIELD, json_type_name};
use crate::error::{StoreError, StoreResult};

/// A validated update specification.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    ops: Vec<UpdateOp>,
}

#[derive(Debug, Clone, PartialEq)]
enum UpdateOp {
    Set(Vec<String>, Value),
    Unset(Vec<String>),
    Inc(Vec<String>, serde_json::Number),
}

impl UpdateSpec {
    /// Parse an update body, wrapping operator-less bodies into `$set`.
    pub fn parse(update: Value) -> StoreResult<Self> {
        let body = match update {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidUpdate(format!(
                    "update must be a JSON object, got {}",
                    json_type_name(&other)
                )));
            }
        };
        if body.is_empty() {
            return Err(StoreError::InvalidUpdate("update document is empty".into()));
        }

        let body = if body.keys().any(|k| k.starts_with('$')) {
            body
        } else {
            let mut wrapped = Map::new();
            wrapped.insert("$set".into(), Value::Object(body));
            wrapped
        };

        let mut ops = Vec::new();
        for (operator, fields) in body {
            let fields = match fields {
                Value::Object(fields) => fields,
                other => {
                    return Err(StoreError::InvalidUpdate(format!(
                        "`{operator}` expects an object, got {}",
                        json_type_name(&other)
                    )));
                }
            };
            for (path, value) in fields {
                let path = split_update_path(&path)?;
                let op = match operator.as_str() {
                    "$set" => UpdateOp::Set(path, value),
                    "$unset" => UpdateOp::Unset(path),
                    "$inc" => match value {
                        Value::Number(n) => UpdateOp::Inc(path, n),
                        other => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "`$inc` expects a number, got {}",
                                json_type_name(&other)
                            )));
                        }
                    },
                    other if other.starts_with('$') => {
                        return Err(StoreError::InvalidUpdate(format!(
                            "unknown update operator `{other}`"
                        )));
                    }
                    other => {
                        return Err(StoreError::InvalidUpdate(format!(
                            "`{other}` is not an operator; do not mix fields and operators"
                        )));
                    }
                };
                ops.push(op);
            }
        }

        Ok(Self { ops })
    }

    /// Apply the update to `doc`.  Returns whether the document changed.
    pub fn apply(&self, doc: &mut Document) -> StoreResult<bool> {
        let before = doc.clone();
        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => set_path(doc, path, value.clone())?,
                UpdateOp::Unset(path) => unset_path(doc, path),
                UpdateOp::Inc(path, by) => inc_path(doc, path, by)?,
            }
        }
        Ok(*doc != before)
    }
}

fn split_update_path(path: &str) -> StoreResult<Vec<String>> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidUpdate(format!("invalid field path `{path}`")));
    }
    if path == ID_FIELD || path.starts_with("_id.") {
        return Err(StoreError::InvalidUpdate("`_id` is immutable".into()));
    }
    Ok(path.split('.').map(str::to_owned).collect())
}

/// Walk to the parent object of the last path segment, creating
/// intermediate objects as needed.
fn parent_mut<'a>(doc: &'a mut Document, path: &[String]) -> StoreResult<&'a mut Document> {
    let mut current = doc;
    for segment in &path[..path.len() - 1] {
        let child = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match child {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidUpdate(format!(
                    "cannot descend into `{segment}`: it is a {}",
                    json_type_name(other)
                )));
            }
        };
    }
    Ok(current)
}

fn leaf(path: &[String]) -> &str {
    path.last().map(String::as_str).unwrap_or_default()
}

fn set_path(doc: &mut Document, path: &[String], value: Value) -> StoreResult<()> {
    parent_mut(doc, path)?.insert(leaf(path).to_owned(), value);
    Ok(())
}

fn unset_path(doc: &mut Document, path: &[String]) {
    let mut current = doc;
    for segment in &path[..path.len() - 1] {
        match current.get_mut(segment) {
            Some(Value::Object(map)) => current = map,
            _ => return,
        }
    }
    current.shift_remove(leaf(path));
}

fn inc_path(doc: &mut Document, path: &[String], by: &serde_json::Number) -> StoreResult<()> {
    let parent = parent_mut(doc, path)?;
    let key = leaf(path);
    let next = match parent.get(key) {
        None => Value::Number(by.clone()),
        Some(Value::Number(current)) => add_numbers(current, by),
        Some(other) => {
            return Err(StoreError::InvalidUpdate(format!(
                "cannot `$inc` field `{key}` of type {}",
                json_type_name(other)
            )));
        }
    };
    parent.insert(key.to_owned(), next);
    Ok(())
}

fn add_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
        && let Some(sum) = x.checked_add(y)
    {
        return Value::from(sum);
    }
    let sum = a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default();
    serde_json::Number::from_f64(sum).map_or(Value::Null, Value::Number)
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn plain_body_is_wrapped_into_set() {
        let spec = UpdateSpec::parse(json!({"salary": 90000})).unwrap();
        let explicit = UpdateSpec::parse(json!({"$set": {"salary": 90000}})).unwrap();
        assert_eq!(spec, explicit);
    }

    #[test]
    fn wrapping_does_not_look_inside_nested_objects() {
        let spec = UpdateSpec::parse(json!({"vehicles": {"$type": "x"}})).unwrap();
        let mut d = doc(json!({"name": "A"}));
        spec.apply(&mut d).unwrap();
        assert_eq!(d["vehicles"], json!({"$type": "x"}));
    }

    #[test]
    fn set_creates_nested_path() {
        let spec = UpdateSpec::parse(json!({"$set": {"vehicles.four_wheeler.type": "Swift"}})).unwrap();
        let mut d = doc(json!({"name": "A"}));
        assert!(spec.apply(&mut d).unwrap());
        assert_eq!(d["vehicles"]["four_wheeler"]["type"], "Swift");
    }

    #[test]
    fn unchanged_document_reports_no_modification() {
        let spec = UpdateSpec::parse(json!({"city": "Pune"})).unwrap();
        let mut d = doc(json!({"city": "Pune"}));
        assert!(!spec.apply(&mut d).unwrap());
    }

    #[test]
    fn unset_and_inc() {
        let spec = UpdateSpec::parse(json!({"$unset": {"city": ""}, "$inc": {"salary": 500}})).unwrap();
        let mut d = doc(json!({"city": "Pune", "salary": 1000}));
        assert!(spec.apply(&mut d).unwrap());
        assert!(d.get("city").is_none());
        assert_eq!(d["salary"], 1500);
    }

    #[test]
    fn unset_keeps_remaining_field_order() {
        let spec = UpdateSpec::parse(json!({"$unset": {"name": ""}})).unwrap();
        let mut d = doc(json!({"name": "Asha", "city": "Thane", "salary": 1, "joinDate": "x"}));
        assert!(spec.apply(&mut d).unwrap());
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["city", "salary", "joinDate"]);
    }

    #[test]
    fn inc_on_string_fails() {
        let spec = UpdateSpec::parse(json!({"$inc": {"name": 1}})).unwrap();
        let mut d = doc(json!({"name": "A"}));
        assert!(spec.apply(&mut d).is_err());
    }

    #[test]
    fn id_cannot_be_updated() {
        assert!(UpdateSpec::parse(json!({"_id": "x"})).is_err());
    }

    #[test]
    fn invalid_bodies_are_rejected() {
        assert!(UpdateSpec::parse(json!({})).is_err());
        assert!(UpdateSpec::parse(json!([1])).is_err());
        assert!(UpdateSpec::parse(json!({"$push": {"a": 1}})).is_err());
        assert!(UpdateSpec::parse(json!({"$set": {"a": 1}, "b": 2})).is_err());
        assert!(UpdateSpec::parse(json!({"$set": 5})).is_err());
    }
}
