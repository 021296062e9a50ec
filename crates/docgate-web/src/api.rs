//! Collections API route handlers.
//!
//! Every endpoint is a thin pass-through to the [`DataAccess`] facade held
//! in [`AppState`].  Responses are always JSON envelopes:
//!
//! | Outcome | HTTP status |
//! |---------|-------------|
//! | success / healthy | 200 |
//! | malformed request (bad JSON, missing field) | 400 |
//! | store failure / unhealthy | 500 |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use docgate_adapters::{DEFAULT_QUERY_LIMIT, DataAccess, Envelope, Status};
use docgate_store::{Document, Filter, document_from_value};

use crate::state::AppState;

/// Status code plus envelope body.
pub type ApiResponse = (StatusCode, Json<Envelope>);

/// Map an envelope produced by the facade to its HTTP status.
fn respond(envelope: Envelope) -> ApiResponse {
    let code = match envelope.status {
        Status::Success | Status::Healthy => StatusCode::OK,
        Status::Error | Status::Unhealthy => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(envelope))
}

fn bad_request(message: impl Into<String>) -> ApiResponse {
    (StatusCode::BAD_REQUEST, Json(Envelope::error(message)))
}

fn rejection(err: JsonRejection) -> ApiResponse {
    bad_request(format!("invalid request body: {}", err.body_text()))
}

/// The `collection` field every write/read body must carry.
fn collection_of(collection: Option<String>) -> Result<String, ApiResponse> {
    match collection {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(bad_request("`collection` is required")),
    }
}

fn filter_of(raw: Value) -> Result<Filter, ApiResponse> {
    Filter::from_value(raw).map_err(|e| bad_request(e.to_string()))
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub collection: Option<String>,
    #[serde(default)]
    pub filter: Value,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub collection: Option<String>,
    pub document: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub collection: Option<String>,
    #[serde(default)]
    pub filter: Value,
    pub update: Option<Value>,
}

/// Body of both delete and export.
#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub collection: Option<String>,
    #[serde(default)]
    pub filter: Value,
}

// ---------------------------------------------------------------------------
// GET /collections
// ---------------------------------------------------------------------------

pub async fn list_collections(State(state): State<Arc<AppState>>) -> ApiResponse {
    respond(state.access.list_collections().await)
}

// ---------------------------------------------------------------------------
// POST /collections/query
// ---------------------------------------------------------------------------

pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResponse {
    match parse_query(payload) {
        Ok((collection, filter, limit)) => {
            respond(state.access.query(&collection, filter, limit).await)
        }
        Err(response) => response,
    }
}

fn parse_query(
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(String, Filter, usize), ApiResponse> {
    let Json(body) = payload.map_err(rejection)?;
    let collection = collection_of(body.collection)?;
    let filter = filter_of(body.filter)?;
    Ok((collection, filter, body.limit.unwrap_or(DEFAULT_QUERY_LIMIT)))
}

// ---------------------------------------------------------------------------
// POST /collections/insert
// ---------------------------------------------------------------------------

pub async fn insert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InsertRequest>, JsonRejection>,
) -> ApiResponse {
    match parse_insert(payload) {
        Ok((collection, document)) => respond(state.access.insert(&collection, document).await),
        Err(response) => response,
    }
}

fn parse_insert(
    payload: Result<Json<InsertRequest>, JsonRejection>,
) -> Result<(String, Document), ApiResponse> {
    let Json(body) = payload.map_err(rejection)?;
    let collection = collection_of(body.collection)?;
    let document = body
        .document
        .ok_or_else(|| bad_request("`document` is required"))?;
    let document = document_from_value(document).map_err(|e| bad_request(e.to_string()))?;
    Ok((collection, document))
}

// ---------------------------------------------------------------------------
// POST /collections/update
// ---------------------------------------------------------------------------

pub async fn update(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResponse {
    match parse_update(payload) {
        Ok((collection, filter, update)) => {
            respond(state.access.update(&collection, filter, update).await)
        }
        Err(response) => response,
    }
}

fn parse_update(
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<(String, Filter, Value), ApiResponse> {
    let Json(body) = payload.map_err(rejection)?;
    let collection = collection_of(body.collection)?;
    let filter = filter_of(body.filter)?;
    let update = body
        .update
        .ok_or_else(|| bad_request("`update` is required"))?;
    Ok((collection, filter, update))
}

// ---------------------------------------------------------------------------
// POST /collections/delete, POST /collections/export
// ---------------------------------------------------------------------------

pub async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> ApiResponse {
    match parse_filter_request(payload) {
        Ok((collection, filter)) => respond(state.access.delete(&collection, filter).await),
        Err(response) => response,
    }
}

pub async fn export(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> ApiResponse {
    match parse_filter_request(payload) {
        Ok((collection, filter)) => respond(state.access.export(&collection, filter).await),
        Err(response) => response,
    }
}

fn parse_filter_request(
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> Result<(String, Filter), ApiResponse> {
    let Json(body) = payload.map_err(rejection)?;
    let collection = collection_of(body.collection)?;
    let filter = filter_of(body.filter)?;
    Ok((collection, filter))
}

// ---------------------------------------------------------------------------
// GET /collections/{name}/info
// ---------------------------------------------------------------------------

pub async fn collection_info(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResponse {
    respond(state.access.collection_info(&name).await)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResponse {
    respond(state.access.health().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_status_maps_to_http_status() {
        assert_eq!(respond(Envelope::success()).0, StatusCode::OK);
        assert_eq!(respond(Envelope::healthy()).0, StatusCode::OK);
        assert_eq!(
            respond(Envelope::error("x")).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            respond(Envelope::unhealthy("x")).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn query_defaults() {
        let body: QueryRequest = serde_json::from_value(json!({"collection": "e"})).unwrap();
        let (collection, filter, limit) = parse_query(Ok(Json(body))).unwrap();
        assert_eq!(collection, "e");
        assert!(filter.is_empty());
        assert_eq!(limit, 100);
    }

    #[test]
    fn missing_collection_is_bad_request() {
        let body: FilterRequest = serde_json::from_value(json!({"filter": {}})).unwrap();
        let (code, Json(envelope)) = parse_filter_request(Ok(Json(body))).unwrap_err();
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.error_message(), Some("`collection` is required"));
    }

    #[test]
    fn non_object_document_is_bad_request() {
        let body: InsertRequest =
            serde_json::from_value(json!({"collection": "e", "document": [1]})).unwrap();
        let (code, _) = parse_insert(Ok(Json(body))).unwrap_err();
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn update_requires_update_body() {
        let body: UpdateRequest =
            serde_json::from_value(json!({"collection": "e", "filter": {"a": 1}})).unwrap();
        let (code, _) = parse_update(Ok(Json(body))).unwrap_err();
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }
}
