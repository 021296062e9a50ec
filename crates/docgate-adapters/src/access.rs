//! The data access facade.
//!
//! [`DataAccess`] is the single seam between callers (HTTP handlers, the
//! command interpreter, MCP tools) and a document store.  It has two
//! implementations: [`StoreAccess`] talks to a [`DocumentStore`] in
//! process, and [`ApiClient`](crate::ApiClient) forwards to the HTTP API.
//!
//! Every method answers with exactly one [`Envelope`]; failures are folded
//! into `status: error` rather than returned as `Err`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use docgate_store::{Document, DocumentStore, Filter};

use crate::envelope::Envelope;
use crate::error::Result;

/// Default number of documents returned by a query.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Number of sample documents included in collection info.
pub const INFO_SAMPLE_SIZE: usize = 2;

/// Typed CRUD operations against a document store.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// `{status, database, collections}`
    async fn list_collections(&self) -> Envelope;

    /// `{status, collection, documents}`
    async fn query(&self, collection: &str, filter: Filter, limit: usize) -> Envelope;

    /// `{status, inserted_id}`
    async fn insert(&self, collection: &str, document: Document) -> Envelope;

    /// `{status, matched, modified}`
    async fn update(&self, collection: &str, filter: Filter, update: Value) -> Envelope;

    /// `{status, deleted_count}`
    async fn delete(&self, collection: &str, filter: Filter) -> Envelope;

    /// `{status, collection, document_count, fields, sample_documents}`
    async fn collection_info(&self, collection: &str) -> Envelope;

    /// `{status, rows, data}` with every matching document.
    async fn export(&self, collection: &str, filter: Filter) -> Envelope;

    /// `{status: healthy, database}` or `{status: unhealthy, error}`.
    async fn health(&self) -> Envelope;
}

// ---------------------------------------------------------------------------
// In-process implementation
// ---------------------------------------------------------------------------

/// [`DataAccess`] over an embedded [`DocumentStore`].
#[derive(Clone)]
pub struct StoreAccess {
    store: DocumentStore,
    database_name: String,
}

impl StoreAccess {
    /// Wrap `store`, reporting `database_name` in listings and health checks.
    pub fn new(store: DocumentStore, database_name: impl Into<String>) -> Self {
        Self {
            store,
            database_name: database_name.into(),
        }
    }

    /// The logical database name.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn try_list_collections(&self) -> Result<Envelope> {
        let collections = self.store.list_collections().await?;
        Ok(Envelope::success()
            .with("database", self.database_name.as_str())
            .with("collections", collections))
    }

    async fn try_query(&self, collection: &str, filter: &Filter, limit: usize) -> Result<Envelope> {
        let documents = self.store.find(collection, filter, limit).await?;
        Ok(Envelope::success()
            .with("collection", collection)
            .with("documents", documents_value(documents)))
    }

    async fn try_insert(&self, collection: &str, document: Document) -> Result<Envelope> {
        let id = self.store.insert_one(collection, document).await?;
        Ok(Envelope::success().with("inserted_id", id))
    }

    async fn try_update(&self, collection: &str, filter: &Filter, update: Value) -> Result<Envelope> {
        let outcome = self.store.update_many(collection, filter, update).await?;
        Ok(Envelope::success()
            .with("matched", outcome.matched)
            .with("modified", outcome.modified))
    }

    async fn try_delete(&self, collection: &str, filter: &Filter) -> Result<Envelope> {
        let deleted = self.store.delete_many(collection, filter).await?;
        Ok(Envelope::success().with("deleted_count", deleted))
    }

    async fn try_collection_info(&self, collection: &str) -> Result<Envelope> {
        let info = self.store.collection_info(collection, INFO_SAMPLE_SIZE).await?;
        Ok(Envelope::success()
            .with("collection", info.collection)
            .with("document_count", info.document_count)
            .with("fields", info.fields)
            .with("sample_documents", documents_value(info.sample_documents)))
    }

    async fn try_export(&self, collection: &str, filter: &Filter) -> Result<Envelope> {
        let documents = self.store.find(collection, filter, usize::MAX).await?;
        Ok(Envelope::success()
            .with("rows", documents.len())
            .with("data", documents_value(documents)))
    }
}

fn documents_value(documents: Vec<Document>) -> Value {
    Value::Array(documents.into_iter().map(Value::Object).collect())
}

fn log_failure(operation: &str, envelope: Envelope) -> Envelope {
    if let Some(error) = envelope.error_message() {
        warn!(operation, error, "store operation failed");
    }
    envelope
}

#[async_trait]
impl DataAccess for StoreAccess {
    async fn list_collections(&self) -> Envelope {
        log_failure("list_collections", self.try_list_collections().await.into())
    }

    async fn query(&self, collection: &str, filter: Filter, limit: usize) -> Envelope {
        debug!(collection, limit, "query");
        log_failure("query", self.try_query(collection, &filter, limit).await.into())
    }

    async fn insert(&self, collection: &str, document: Document) -> Envelope {
        debug!(collection, "insert");
        log_failure("insert", self.try_insert(collection, document).await.into())
    }

    async fn update(&self, collection: &str, filter: Filter, update: Value) -> Envelope {
        debug!(collection, "update");
        log_failure("update", self.try_update(collection, &filter, update).await.into())
    }

    async fn delete(&self, collection: &str, filter: Filter) -> Envelope {
        debug!(collection, "delete");
        log_failure("delete", self.try_delete(collection, &filter).await.into())
    }

    async fn collection_info(&self, collection: &str) -> Envelope {
        log_failure("collection_info", self.try_collection_info(collection).await.into())
    }

    async fn export(&self, collection: &str, filter: Filter) -> Envelope {
        debug!(collection, "export");
        log_failure("export", self.try_export(collection, &filter).await.into())
    }

    async fn health(&self) -> Envelope {
        match self.store.ping().await {
            Ok(()) => Envelope::healthy().with("database", self.database_name.as_str()),
            Err(e) => {
                warn!(error = %e, "health check failed");
                Envelope::unhealthy(e.to_string())
            }
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_store::Database;
    use serde_json::json;

    async fn access() -> StoreAccess {
        let store = DocumentStore::new(Database::in_memory_migrated().await.unwrap());
        StoreAccess::new(store, "companyDB")
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_then_query_round_trip() {
        let access = access().await;
        let inserted = access
            .insert("employees", doc(json!({"name": "Rohan", "city": "Pune"})))
            .await;
        assert!(inserted.is_success());
        let id = inserted.get("inserted_id").and_then(Value::as_str).unwrap().to_owned();

        let result = access.query("employees", Filter::empty(), DEFAULT_QUERY_LIMIT).await;
        assert_eq!(result.get("collection"), Some(&json!("employees")));
        let docs = result.documents("documents");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["_id"], json!(id));
    }

    #[tokio::test]
    async fn list_collections_reports_database_name() {
        let access = access().await;
        access.insert("b", doc(json!({"x": 1}))).await;
        access.insert("a", doc(json!({"x": 1}))).await;

        let env = access.list_collections().await;
        assert_eq!(env.get("database"), Some(&json!("companyDB")));
        assert_eq!(env.get("collections"), Some(&json!(["a", "b"])));
    }

    #[tokio::test]
    async fn update_reports_zero_counts() {
        let access = access().await;
        let env = access
            .update("employees", Filter::empty().with("name", "Ghost"), json!({"city": "X"}))
            .await;
        assert!(env.is_success());
        assert_eq!(env.get("matched"), Some(&json!(0)));
        assert_eq!(env.get("modified"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn store_errors_become_error_envelopes() {
        let access = access().await;
        let bad = Filter::from_value(json!({"$where": "1"})).unwrap();
        let env = access.query("employees", bad, 10).await;
        assert!(!env.is_success());
        assert!(env.error_message().unwrap().contains("$where"));
    }

    #[tokio::test]
    async fn info_and_export() {
        let access = access().await;
        for name in ["A", "B", "C"] {
            access.insert("e", doc(json!({"name": name}))).await;
        }

        let info = access.collection_info("e").await;
        assert_eq!(info.get("document_count"), Some(&json!(3)));
        assert_eq!(info.get("fields"), Some(&json!(["_id", "name"])));
        assert_eq!(info.documents("sample_documents").len(), 2);

        let export = access.export("e", Filter::empty()).await;
        assert_eq!(export.get("rows"), Some(&json!(3)));
        assert_eq!(export.documents("data").len(), 3);
    }

    #[tokio::test]
    async fn health_is_healthy_on_open_store() {
        let env = access().await.health().await;
        assert_eq!(env.status, crate::Status::Healthy);
        assert_eq!(env.get("database"), Some(&json!("companyDB")));
    }
}
