//! Collection-level CRUD over JSON documents.
//!
//! Documents live in the `documents` table as serialized JSON, one row per
//! document, keyed by `(collection, doc_id)`.  Filters are evaluated in
//! process after the collection's rows are read in insertion order, which
//! keeps the query language independent of SQLite's JSON functions.
//!
//! Collections are created implicitly by the first insert and are kept
//! even when all their documents are deleted.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::document::{Document, Filter, ID_FIELD, id_to_string};
use crate::error::{StoreError, StoreResult};
use crate::filter::CompiledFilter;
use crate::update::UpdateSpec;

/// Counts reported by [`DocumentStore::update_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// Summary returned by [`DocumentStore::collection_info`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub collection: String,
    pub document_count: u64,
    /// Field names of the first sample document, in stored order.
    pub fields: Vec<String>,
    pub sample_documents: Vec<Document>,
}

/// Handle to the document collections of one database.
#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    /// Create a document store backed by an already migrated `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Borrow the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Check that the database answers.
    pub async fn ping(&self) -> StoreResult<()> {
        self.db.ping().await
    }

    /// Names of all collections, sorted.
    #[instrument(skip(self))]
    pub async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
    }

    /// Return up to `limit` documents matching `filter`, in insertion order.
    /// A `limit` of 0 means no limit.
    ///
    /// A collection that does not exist yields no documents.
    #[instrument(skip(self, filter))]
    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> StoreResult<Vec<Document>> {
        validate_collection_name(collection)?;
        let compiled = CompiledFilter::compile(filter)?;
        let collection = collection.to_owned();
        let limit = if limit == 0 { usize::MAX } else { limit };

        let docs = self
            .db
            .execute(move |conn| {
                let mut matched = Vec::new();
                for (_, doc) in load_collection(conn, &collection)? {
                    if compiled.matches(&doc) {
                        matched.push(doc);
                        if matched.len() >= limit {
                            break;
                        }
                    }
                }
                Ok(matched)
            })
            .await?;

        debug!(count = docs.len(), "documents found");
        Ok(docs)
    }

    /// Insert one document and return its `_id`.
    ///
    /// A caller-supplied string or numeric `_id` is kept (as a string);
    /// otherwise a UUID v7 is assigned.
    #[instrument(skip(self, document))]
    pub async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<String> {
        validate_collection_name(collection)?;

        let id = match document.get(ID_FIELD) {
            Some(value) => id_to_string(value)?,
            None => Uuid::now_v7().simple().to_string(),
        };
        // `_id` always leads the stored document.
        document.shift_remove(ID_FIELD);
        let mut stored = Document::new();
        stored.insert(ID_FIELD.into(), Value::String(id.clone()));
        stored.extend(document);

        let body = serde_json::to_string(&stored)?;
        let collection = collection.to_owned();
        let doc_id = id.clone();

        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let now = Utc::now().timestamp();
                ensure_collection(&tx, &collection, now)?;

                let inserted = tx.execute(
                    "INSERT INTO documents (collection, doc_id, body, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?4) ON CONFLICT(collection, doc_id) DO NOTHING",
                    rusqlite::params![collection, doc_id, body, now],
                )?;
                if inserted == 0 {
                    return Err(StoreError::DuplicateKey {
                        collection,
                        id: doc_id,
                    });
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        debug!(id = %id, "document inserted");
        Ok(id)
    }

    /// Apply `update` to every document matching `filter`.
    #[instrument(skip(self, filter, update))]
    pub async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: Value,
    ) -> StoreResult<UpdateOutcome> {
        validate_collection_name(collection)?;
        let compiled = CompiledFilter::compile(filter)?;
        let spec = UpdateSpec::parse(update)?;
        let collection = collection.to_owned();

        let outcome = self
            .db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let now = Utc::now().timestamp();
                let mut outcome = UpdateOutcome {
                    matched: 0,
                    modified: 0,
                };

                for (seq, mut doc) in load_collection(&tx, &collection)? {
                    if !compiled.matches(&doc) {
                        continue;
                    }
                    outcome.matched += 1;
                    if spec.apply(&mut doc)? {
                        tx.execute(
                            "UPDATE documents SET body = ?1, updated_at = ?2 WHERE seq = ?3",
                            rusqlite::params![serde_json::to_string(&doc)?, now, seq],
                        )?;
                        outcome.modified += 1;
                    }
                }

                tx.commit()?;
                Ok(outcome)
            })
            .await?;

        debug!(matched = outcome.matched, modified = outcome.modified, "documents updated");
        Ok(outcome)
    }

    /// Delete every document matching `filter` and return how many went.
    #[instrument(skip(self, filter))]
    pub async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        validate_collection_name(collection)?;
        let compiled = CompiledFilter::compile(filter)?;
        let collection = collection.to_owned();

        let deleted = self
            .db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let mut deleted = 0_u64;
                for (seq, doc) in load_collection(&tx, &collection)? {
                    if compiled.matches(&doc) {
                        tx.execute("DELETE FROM documents WHERE seq = ?1", [seq])?;
                        deleted += 1;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await?;

        debug!(deleted, "documents deleted");
        Ok(deleted)
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> StoreResult<u64> {
        validate_collection_name(collection)?;
        let collection = collection.to_owned();
        self.db
            .execute(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT count(*) FROM documents WHERE collection = ?1",
                    [&collection],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
    }

    /// Document count, field names and the first `sample` documents.
    #[instrument(skip(self))]
    pub async fn collection_info(
        &self,
        collection: &str,
        sample: usize,
    ) -> StoreResult<CollectionInfo> {
        let document_count = self.count(collection).await?;
        let sample_documents = self.find(collection, &Filter::empty(), sample).await?;
        let fields = sample_documents
            .first()
            .map(|doc| doc.keys().cloned().collect())
            .unwrap_or_default();

        Ok(CollectionInfo {
            collection: collection.to_owned(),
            document_count,
            fields,
            sample_documents,
        })
    }
}

// ── internals ────────────────────────────────────────────────────────

/// Reject names that cannot address a collection.
pub fn validate_collection_name(name: &str) -> StoreResult<()> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name.contains('$') {
        "name contains `$`"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else if name.starts_with("system.") {
        "the `system.` prefix is reserved"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidCollection {
        name: name.to_owned(),
        reason,
    })
}

fn ensure_collection(conn: &Connection, collection: &str, now: i64) -> StoreResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM collections WHERE name = ?1",
            [collection],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if exists.is_none() {
        conn.execute(
            "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![collection, now],
        )?;
        debug!(collection, "collection created");
    }
    Ok(())
}

/// Read every document of `collection` with its row sequence number.
fn load_collection(conn: &Connection, collection: &str) -> StoreResult<Vec<(i64, Document)>> {
    let mut stmt =
        conn.prepare("SELECT seq, body FROM documents WHERE collection = ?1 ORDER BY seq")?;
    let rows = stmt
        .query_map([collection], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(seq, body)| Ok((seq, serde_json::from_str(&body)?)))
        .collect()
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> DocumentStore {
        DocumentStore::new(Database::in_memory_migrated().await.unwrap())
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_string_id_first() {
        let store = store().await;
        let id = store
            .insert_one("employees", doc(json!({"name": "Rohan"})))
            .await
            .unwrap();
        assert_eq!(id.len(), 32);

        let docs = store.find("employees", &Filter::empty(), 10).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].keys().next().map(String::as_str), Some("_id"));
        assert_eq!(docs[0]["_id"], json!(id));
    }

    #[tokio::test]
    async fn caller_supplied_id_is_kept_and_unique() {
        let store = store().await;
        let id = store
            .insert_one("employees", doc(json!({"_id": 7, "name": "A"})))
            .await
            .unwrap();
        assert_eq!(id, "7");

        let err = store
            .insert_one("employees", doc(json!({"_id": "7", "name": "B"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn identical_inserts_create_separate_documents() {
        let store = store().await;
        let a = store.insert_one("e", doc(json!({"name": "X"}))).await.unwrap();
        let b = store.insert_one("e", doc(json!({"name": "X"}))).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count("e").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_respects_filter_and_limit() {
        let store = store().await;
        for salary in [40000, 60000, 80000, 100000] {
            store
                .insert_one("employees", doc(json!({"salary": salary})))
                .await
                .unwrap();
        }
        let filter = Filter::empty().with("salary", json!({"$gt": 50000}));
        let docs = store.find("employees", &filter, 2).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["salary"], 60000);
        assert_eq!(docs[1]["salary"], 80000);
    }

    #[tokio::test]
    async fn zero_limit_returns_every_match() {
        let store = store().await;
        for name in ["Asha", "Rohan", "Neha"] {
            store
                .insert_one("employees", doc(json!({"name": name})))
                .await
                .unwrap();
        }
        let docs = store.find("employees", &Filter::empty(), 0).await.unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn find_on_missing_collection_is_empty() {
        let store = store().await;
        let docs = store.find("nothing", &Filter::empty(), 10).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn update_reports_matched_and_modified() {
        let store = store().await;
        store.insert_one("e", doc(json!({"name": "A", "city": "Pune"}))).await.unwrap();
        store.insert_one("e", doc(json!({"name": "B", "city": "Thane"}))).await.unwrap();

        let outcome = store
            .update_many("e", &Filter::empty(), json!({"city": "Pune"}))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 2, modified: 1 });

        let outcome = store
            .update_many("e", &Filter::empty().with("name", "Z"), json!({"city": "X"}))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 0, modified: 0 });
    }

    #[tokio::test]
    async fn failed_update_leaves_documents_untouched() {
        let store = store().await;
        store.insert_one("e", doc(json!({"n": 1}))).await.unwrap();
        store.insert_one("e", doc(json!({"n": "text"}))).await.unwrap();

        let result = store
            .update_many("e", &Filter::empty(), json!({"$inc": {"n": 1}}))
            .await;
        assert!(result.is_err());

        let docs = store.find("e", &Filter::empty(), 10).await.unwrap();
        assert_eq!(docs[0]["n"], 1);
    }

    #[tokio::test]
    async fn delete_removes_all_matches_and_is_idempotent() {
        let store = store().await;
        for name in ["A", "A", "B"] {
            store.insert_one("e", doc(json!({"name": name}))).await.unwrap();
        }
        let filter = Filter::empty().with("name", "A");
        assert_eq!(store.delete_many("e", &filter).await.unwrap(), 2);
        assert_eq!(store.delete_many("e", &filter).await.unwrap(), 0);
        assert_eq!(store.count("e").await.unwrap(), 1);
        assert_eq!(store.list_collections().await.unwrap(), vec!["e".to_string()]);
    }

    #[tokio::test]
    async fn collection_info_samples_first_documents() {
        let store = store().await;
        for i in 0..3 {
            store
                .insert_one("e", doc(json!({"name": format!("N{i}"), "city": "Pune"})))
                .await
                .unwrap();
        }
        let info = store.collection_info("e", 2).await.unwrap();
        assert_eq!(info.document_count, 3);
        assert_eq!(info.sample_documents.len(), 2);
        assert_eq!(info.fields, vec!["_id", "name", "city"]);
    }

    #[tokio::test]
    async fn invalid_collection_names_are_rejected() {
        let store = store().await;
        for name in ["", "  ", "a$b", "system.users"] {
            let err = store.find(name, &Filter::empty(), 1).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidCollection { .. }), "{name}");
        }
    }

    #[tokio::test]
    async fn malformed_filter_surfaces_store_error() {
        let store = store().await;
        let filter = Filter::from_value(json!({"$bogus": 1})).unwrap();
        let err = store.find("e", &filter, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));
    }
}
