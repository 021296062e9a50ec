//! # docgate-store
//!
//! Embedded document store for docgate.
//!
//! Named collections hold schema-free JSON documents, each carrying a
//! string `_id`.  Documents are persisted in SQLite (WAL mode) and queried
//! with Mongo-style filter documents evaluated in process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  DocumentStore (find / insert / update / │
//! │                 delete / info)           │
//! ├─────────────────────────────────────────┤
//! │  CompiledFilter      UpdateSpec          │
//! │  ($eq $gt $in $or …) ($set $unset $inc)  │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL)                 │
//! │  Migrations (versioned, transactional)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use docgate_store::{Database, DocumentStore, Filter};
//!
//! let db = Database::open_and_migrate("data/docgate.db").await?;
//! let store = DocumentStore::new(db);
//! let engineers = store
//!     .find("employees", &Filter::empty().with("department", "Engineering"), 100)
//!     .await?;
//! ```

pub mod collection;
pub mod db;
pub mod document;
pub mod error;
pub mod filter;
pub mod migration;
pub mod update;

// ── re-exports ───────────────────────────────────────────────────────

pub use collection::{CollectionInfo, DocumentStore, UpdateOutcome, validate_collection_name};
pub use db::Database;
pub use document::{Document, Filter, ID_FIELD, document_from_value, id_to_string};
pub use error::{StoreError, StoreResult};
pub use filter::CompiledFilter;
pub use update::UpdateSpec;
