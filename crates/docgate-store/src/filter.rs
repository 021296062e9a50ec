//! Mongo-style filter evaluation.
//!
//! A [`Filter`] is compiled once into a [`CompiledFilter`] tree, then
//! evaluated against every candidate document.  Compilation is where all
//! validation happens (unknown operators, malformed regexes, wrong operand
//! types); evaluation itself cannot fail.
//!
//! Supported syntax:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `{"a.b": v}` | equality on a dotted path |
//! | `{"a": {"$gt": v}}` | `$eq $ne $gt $gte $lt $lte $in $nin $exists $size $not` |
//! | `{"a": {"$regex": p, "$options": "i"}}` | regex match (`i m s x` options) |
//! | `{"$or": [..]}` | `$or`, `$and`, `$nor` over sub-filters |
//!
//! Paths that traverse a list match when any element matches, and an
//! equality against a list-valued field matches when the list contains the
//! operand.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::document::{Document, Filter, json_type_name};
use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

/// A validated filter, ready to be evaluated against documents.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    Or(Vec<CompiledFilter>),
    And(Vec<CompiledFilter>),
    Nor(Vec<CompiledFilter>),
    Field { path: Vec<String>, ops: Vec<Op> },
}

#[derive(Debug, Clone)]
enum Op {
    Eq(Value),
    Ne(Value),
    Cmp(Ordering, bool, Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Size(usize),
    Regex(Regex),
    Not(Vec<Op>),
}

impl CompiledFilter {
    /// Validate and compile `filter`.
    pub fn compile(filter: &Filter) -> StoreResult<Self> {
        compile_map(filter.as_map())
    }

    /// Whether `doc` satisfies every clause of the filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }
}

impl Clause {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Or(branches) => branches.iter().any(|b| b.matches(doc)),
            Self::And(branches) => branches.iter().all(|b| b.matches(doc)),
            Self::Nor(branches) => !branches.iter().any(|b| b.matches(doc)),
            Self::Field { path, ops } => {
                let mut found = Vec::new();
                resolve_in_map(doc, path, &mut found);
                ops.iter().all(|op| op.matches(&found))
            }
        }
    }
}

impl Op {
    /// Evaluate against the values a path resolved to.  `found` is empty
    /// when the path does not exist in the document.
    fn matches(&self, found: &[&Value]) -> bool {
        match self {
            Self::Eq(operand) => eq_any(found, operand),
            Self::Ne(operand) => !eq_any(found, operand),
            Self::Cmp(ordering, or_equal, operand) => expanded(found).any(|v| {
                compare(v, operand).is_some_and(|o| o == *ordering || (*or_equal && o.is_eq()))
            }),
            Self::In(candidates) => candidates.iter().any(|c| eq_any(found, c)),
            Self::Nin(candidates) => !candidates.iter().any(|c| eq_any(found, c)),
            Self::Exists(expected) => found.is_empty() != *expected,
            Self::Size(len) => found
                .iter()
                .any(|v| v.as_array().is_some_and(|items| items.len() == *len)),
            Self::Regex(re) => expanded(found).any(|v| v.as_str().is_some_and(|s| re.is_match(s))),
            Self::Not(inner) => !inner.iter().all(|op| op.matches(found)),
        }
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

fn compile_map(conditions: &Map<String, Value>) -> StoreResult<CompiledFilter> {
    let mut clauses = Vec::with_capacity(conditions.len());

    for (key, condition) in conditions {
        let clause = match key.as_str() {
            "$or" => Clause::Or(compile_branches(key, condition)?),
            "$and" => Clause::And(compile_branches(key, condition)?),
            "$nor" => Clause::Nor(compile_branches(key, condition)?),
            op if op.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top-level operator `{op}`"
                )));
            }
            path => Clause::Field {
                path: split_path(path)?,
                ops: compile_condition(condition)?,
            },
        };
        clauses.push(clause);
    }

    Ok(CompiledFilter { clauses })
}

fn compile_branches(op: &str, condition: &Value) -> StoreResult<Vec<CompiledFilter>> {
    let branches = condition.as_array().ok_or_else(|| {
        StoreError::InvalidFilter(format!(
            "`{op}` expects an array, got {}",
            json_type_name(condition)
        ))
    })?;
    if branches.is_empty() {
        return Err(StoreError::InvalidFilter(format!(
            "`{op}` expects a non-empty array"
        )));
    }

    branches
        .iter()
        .map(|branch| match branch {
            Value::Object(map) => compile_map(map),
            other => Err(StoreError::InvalidFilter(format!(
                "`{op}` entries must be objects, got {}",
                json_type_name(other)
            ))),
        })
        .collect()
}

fn split_path(path: &str) -> StoreResult<Vec<String>> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidFilter(format!(
            "invalid field path `{path}`"
        )));
    }
    Ok(path.split('.').map(str::to_owned).collect())
}

/// Compile the right-hand side of a field condition.
///
/// An object whose keys are operators is an operator expression; anything
/// else is a literal equality operand.
fn compile_condition(condition: &Value) -> StoreResult<Vec<Op>> {
    match condition {
        Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => compile_operators(map),
        literal => Ok(vec![Op::Eq(literal.clone())]),
    }
}

fn compile_operators(map: &Map<String, Value>) -> StoreResult<Vec<Op>> {
    let mut ops = Vec::with_capacity(map.len());

    for (op, operand) in map {
        let compiled = match op.as_str() {
            "$eq" => Op::Eq(operand.clone()),
            "$ne" => Op::Ne(operand.clone()),
            "$gt" => Op::Cmp(Ordering::Greater, false, operand.clone()),
            "$gte" => Op::Cmp(Ordering::Greater, true, operand.clone()),
            "$lt" => Op::Cmp(Ordering::Less, false, operand.clone()),
            "$lte" => Op::Cmp(Ordering::Less, true, operand.clone()),
            "$in" => Op::In(array_operand(op, operand)?),
            "$nin" => Op::Nin(array_operand(op, operand)?),
            "$exists" => Op::Exists(truthy(operand)),
            "$size" => {
                let len = operand.as_u64().ok_or_else(|| {
                    StoreError::InvalidFilter("`$size` expects a non-negative integer".into())
                })?;
                Op::Size(len as usize)
            }
            "$regex" => {
                let options = match map.get("$options") {
                    None => "",
                    Some(Value::String(s)) => s.as_str(),
                    Some(other) => {
                        return Err(StoreError::InvalidFilter(format!(
                            "`$options` expects a string, got {}",
                            json_type_name(other)
                        )));
                    }
                };
                Op::Regex(compile_regex(operand, options)?)
            }
            "$options" => {
                if !map.contains_key("$regex") {
                    return Err(StoreError::InvalidFilter(
                        "`$options` needs a `$regex` in the same condition".into(),
                    ));
                }
                continue;
            }
            "$not" => match operand {
                Value::Object(inner) => Op::Not(compile_operators(inner)?),
                other => {
                    return Err(StoreError::InvalidFilter(format!(
                        "`$not` expects an operator object, got {}",
                        json_type_name(other)
                    )));
                }
            },
            other => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown operator `{other}`"
                )));
            }
        };
        ops.push(compiled);
    }

    Ok(ops)
}

fn array_operand(op: &str, operand: &Value) -> StoreResult<Vec<Value>> {
    operand.as_array().cloned().ok_or_else(|| {
        StoreError::InvalidFilter(format!(
            "`{op}` expects an array, got {}",
            json_type_name(operand)
        ))
    })
}

fn compile_regex(pattern: &Value, options: &str) -> StoreResult<Regex> {
    let pattern = pattern.as_str().ok_or_else(|| {
        StoreError::InvalidFilter(format!(
            "`$regex` expects a string, got {}",
            json_type_name(pattern)
        ))
    })?;

    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(StoreError::InvalidFilter(format!(
                    "unsupported regex option `{other}`"
                )));
            }
        };
    }

    builder
        .build()
        .map_err(|e| StoreError::InvalidFilter(format!("bad regex `{pattern}`: {e}")))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Evaluation helpers
// ---------------------------------------------------------------------------

/// Collect every value reachable through `path`, descending into lists.
fn resolve_in_map<'a>(map: &'a Map<String, Value>, path: &[String], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    if let Some(child) = map.get(head) {
        resolve(child, rest, out);
    }
}

fn resolve<'a>(value: &'a Value, path: &[String], out: &mut Vec<&'a Value>) {
    let Some((head, _)) = path.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Value::Object(map) => resolve_in_map(map, path, out),
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>()
                && let Some(item) = items.get(index)
            {
                resolve(item, &path[1..], out);
            }
            for item in items.iter().filter(|item| item.is_object()) {
                resolve(item, path, out);
            }
        }
        _ => {}
    }
}

/// The resolved values plus the elements of any list among them.
fn expanded<'a>(found: &'a [&'a Value]) -> impl Iterator<Item = &'a Value> + 'a {
    found.iter().flat_map(|v| {
        let elements: &[Value] = match v {
            Value::Array(items) => items,
            _ => &[],
        };
        std::iter::once(*v).chain(elements.iter())
    })
}

fn eq_any(found: &[&Value], operand: &Value) -> bool {
    if found.is_empty() {
        return operand.is_null();
    }
    expanded(found).any(|v| values_equal(v, operand))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Order two values of the same JSON type; mixed types do not compare.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ── tests ────────────────────────────────────────────────────────────
