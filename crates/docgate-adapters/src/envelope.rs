//! The uniform result envelope.
//!
//! Every data access call answers with exactly one [`Envelope`]:
//!
//! ```json
//! {"status": "success", "collection": "employees", "documents": [...]}
//! {"status": "error", "error": "Cannot connect to API at http://..."}
//! ```
//!
//! The payload is flattened next to `status`, so the wire shape is the same
//! whether the envelope was produced in process or decoded from the HTTP
//! API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use docgate_store::Document;

/// Outcome marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
    Healthy,
    Unhealthy,
}

/// A status, an optional error message and an open payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    fn new(status: Status, error: Option<String>) -> Self {
        Self {
            status,
            error,
            payload: Map::new(),
        }
    }

    /// An empty success envelope.
    pub fn success() -> Self {
        Self::new(Status::Success, None)
    }

    /// An error envelope carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, Some(message.into()))
    }

    /// A healthy health-check envelope.
    pub fn healthy() -> Self {
        Self::new(Status::Healthy, None)
    }

    /// An unhealthy health-check envelope carrying `message`.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(Status::Unhealthy, Some(message.into()))
    }

    /// Add a payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Whether the envelope reports success (or a healthy check).
    pub fn is_success(&self) -> bool {
        matches!(self.status, Status::Success | Status::Healthy)
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// The error text, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Documents held in the list-valued payload field `key`.
    ///
    /// Non-object entries are skipped; a missing field yields nothing.
    pub fn documents(&self, key: &str) -> Vec<Document> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Serialize into a JSON value.
    pub fn into_value(self) -> Value {
        let mut out = Map::new();
        out.insert(
            "status".into(),
            serde_json::to_value(self.status).unwrap_or(Value::Null),
        );
        if let Some(error) = self.error {
            out.insert("error".into(), Value::String(error));
        }
        out.extend(self.payload);
        Value::Object(out)
    }
}

impl<T, E> From<Result<T, E>> for Envelope
where
    T: Into<Envelope>,
    E: std::fmt::Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(envelope) => envelope.into(),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
