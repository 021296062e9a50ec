//! Integration tests for [`ApiClient`] against a stub HTTP server.
//!
//! The stub answers with canned bodies so the client's handling of
//! envelopes, HTTP errors and request shapes can be checked without a real
//! store behind it.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use docgate_adapters::{ApiClient, ApiClientConfig, DataAccess, Status};
use docgate_store::Filter;

type Seen = Arc<Mutex<Vec<Value>>>;

async fn spawn_stub() -> (String, Seen) {
    let seen: Seen = Arc::default();

    let app = Router::new()
        .route(
            "/collections",
            get(|| async { Json(json!({"status": "success", "database": "companyDB", "collections": ["employees"]})) }),
        )
        .route(
            "/collections/query",
            post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                Json(json!({"status": "success", "collection": "employees", "documents": [{"_id": "1", "name": "Asha"}]}))
            }),
        )
        .route(
            "/collections/insert",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": "error", "error": "duplicate key"})),
                )
            }),
        )
        .route(
            "/collections/{name}/info",
            get(|Path(name): Path<String>| async move {
                Json(json!({"status": "success", "collection": name, "document_count": 0}))
            }),
        )
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), seen)
}

fn client(base_url: String) -> ApiClient {
    ApiClient::new(ApiClientConfig {
        base_url,
        enabled: true,
    })
    .unwrap()
}

#[tokio::test]
async fn list_collections_decodes_envelope() {
    let (base, _) = spawn_stub().await;
    let env = client(base).list_collections().await;
    assert_eq!(env.status, Status::Success);
    assert_eq!(env.get("collections"), Some(&json!(["employees"])));
}

#[tokio::test]
async fn query_sends_collection_filter_and_limit() {
    let (base, seen) = spawn_stub().await;
    let filter = Filter::empty().with("city", "Thane");
    let env = client(base).query("employees", filter, 200).await;

    assert_eq!(env.documents("documents")[0]["name"], "Asha");
    let body = seen.lock().unwrap().pop().unwrap();
    assert_eq!(
        body,
        json!({"collection": "employees", "filter": {"city": "Thane"}, "limit": 200})
    );
}

#[tokio::test]
async fn server_error_envelope_is_passed_through() {
    let (base, _) = spawn_stub().await;
    let doc = json!({"_id": "1"}).as_object().cloned().unwrap();
    let env = client(base).insert("employees", doc).await;
    assert_eq!(env.status, Status::Error);
    assert_eq!(env.error_message(), Some("duplicate key"));
}

#[tokio::test]
async fn missing_route_becomes_request_error() {
    let (base, _) = spawn_stub().await;
    let env = client(base).delete("employees", Filter::empty()).await;
    let message = env.error_message().unwrap();
    assert!(message.starts_with("API request failed: 404"), "{message}");
}

#[tokio::test]
async fn info_path_carries_collection_name() {
    let (base, _) = spawn_stub().await;
    let env = client(base).collection_info("employees").await;
    assert_eq!(env.get("collection"), Some(&json!("employees")));
}
