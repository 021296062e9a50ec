//! Collection CRUD exposed as tools.
//!
//! Filters, documents and update specs arrive as JSON *strings*
//! (`filter_dict`, `document`, `update_dict`) so that tool-calling agents
//! can pass them through a flat argument schema.  Argument errors are
//! answered with an error envelope, like any other failure; only an
//! unknown tool name is an `Err`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use docgate_store::{Filter, document_from_value};

use crate::access::{DEFAULT_QUERY_LIMIT, DataAccess};
use crate::envelope::Envelope;
use crate::error::{AdapterError, Result};
use crate::traits::{Adapter, HealthStatus, ToolDefinition};

/// Tool adapter over any [`DataAccess`] implementation.
pub struct CollectionsAdapter {
    id: String,
    access: Arc<dyn DataAccess>,
}

impl CollectionsAdapter {
    /// Create a new adapter forwarding to `access`.
    pub fn new(id: impl Into<String>, access: Arc<dyn DataAccess>) -> Self {
        Self {
            id: id.into(),
            access,
        }
    }

    async fn dispatch(&self, name: &str, params: &Value) -> Result<Envelope> {
        let envelope = match name {
            "query_collection" => {
                let collection = required_str(name, params, "collection")?;
                let filter = optional_filter(name, params, "filter_dict")?;
                let limit = params
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map_or(DEFAULT_QUERY_LIMIT, |n| n as usize);
                self.access.query(collection, filter, limit).await
            }
            "insert_document" => {
                let collection = required_str(name, params, "collection")?;
                let document = document_from_value(required_json(name, params, "document")?)?;
                self.access.insert(collection, document).await
            }
            "update_document" => {
                let collection = required_str(name, params, "collection")?;
                let filter = Filter::from_value(required_json(name, params, "filter_dict")?)?;
                let update = required_json(name, params, "update_dict")?;
                self.access.update(collection, filter, update).await
            }
            "delete_document" => {
                let collection = required_str(name, params, "collection")?;
                let filter = Filter::from_value(required_json(name, params, "filter_dict")?)?;
                self.access.delete(collection, filter).await
            }
            "list_collections" => self.access.list_collections().await,
            "get_collection_info" => {
                let collection = required_str(name, params, "collection")?;
                self.access.collection_info(collection).await
            }
            "health_check" => self.access.health().await,
            _ => {
                return Err(AdapterError::ToolNotFound {
                    adapter_id: self.id.clone(),
                    tool_name: name.to_owned(),
                });
            }
        };
        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn required_str<'a>(tool: &str, params: &'a Value, field: &str) -> Result<&'a str> {
    params
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::InvalidParams {
            tool_name: tool.to_owned(),
            reason: format!("missing required string field `{field}`"),
        })
}

/// Decode a field holding a JSON-encoded string.  Already-decoded objects
/// are accepted as well.
fn decode_json(tool: &str, field: &str, raw: &Value) -> Result<Value> {
    match raw {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|e| AdapterError::InvalidParams {
                tool_name: tool.to_owned(),
                reason: format!("`{field}` is not valid JSON: {e}"),
            })
        }
        other => Ok(other.clone()),
    }
}

fn required_json(tool: &str, params: &Value, field: &str) -> Result<Value> {
    let raw = params.get(field).ok_or_else(|| AdapterError::InvalidParams {
        tool_name: tool.to_owned(),
        reason: format!("missing required field `{field}`"),
    })?;
    decode_json(tool, field, raw)
}

fn optional_filter(tool: &str, params: &Value, field: &str) -> Result<Filter> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(Filter::empty()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Filter::empty()),
        Some(raw) => Ok(Filter::from_value(decode_json(tool, field, raw)?)?),
    }
}

fn collection_param() -> Value {
    json!({ "type": "string", "description": "Collection name, e.g. `employees`" })
}

// ---------------------------------------------------------------------------
// Adapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for CollectionsAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if self.access.health().await.is_success() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "query_collection".into(),
                description: "Query documents of a collection with a Mongo-style filter".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "collection": collection_param(),
                        "filter_dict": {
                            "type": "string",
                            "description": "Filter as a JSON string, e.g. {\"city\": \"Pune\"}"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum documents to return (default 100)"
                        }
                    },
                    "required": ["collection"]
                }),
            },
            ToolDefinition {
                name: "insert_document".into(),
                description: "Insert one document into a collection".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "collection": collection_param(),
                        "document": {
                            "type": "string",
                            "description": "Document as a JSON string"
                        }
                    },
                    "required": ["collection", "document"]
                }),
            },
            ToolDefinition {
                name: "update_document".into(),
                description: "Update every document matching a filter".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "collection": collection_param(),
                        "filter_dict": {
                            "type": "string",
                            "description": "Filter as a JSON string"
                        },
                        "update_dict": {
                            "type": "string",
                            "description": "Fields to set, or a $set/$unset/$inc document, as a JSON string"
                        }
                    },
                    "required": ["collection", "filter_dict", "update_dict"]
                }),
            },
            ToolDefinition {
                name: "delete_document".into(),
                description: "Delete every document matching a filter".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "collection": collection_param(),
                        "filter_dict": {
                            "type": "string",
                            "description": "Filter as a JSON string"
                        }
                    },
                    "required": ["collection", "filter_dict"]
                }),
            },
            ToolDefinition {
                name: "list_collections".into(),
                description: "List the collections of the database".into(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: "get_collection_info".into(),
                description: "Document count, field names and two sample documents".into(),
                parameters: json!({
                    "type": "object",
                    "properties": { "collection": collection_param() },
                    "required": ["collection"]
                }),
            },
            ToolDefinition {
                name: "health_check".into(),
                description: "Check that the document API and its store answer".into(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
        ]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<Value> {
        debug!(adapter = %self.id, tool = name, "executing tool");
        match self.dispatch(name, &params).await {
            Ok(envelope) => Ok(envelope.into_value()),
            Err(e @ AdapterError::ToolNotFound { .. }) => Err(e),
            Err(e) => Ok(Envelope::error(e.to_string()).into_value()),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
