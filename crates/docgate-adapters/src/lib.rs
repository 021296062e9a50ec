//! # docgate-adapters
//!
//! The data access facade of docgate and the tool adapters built on it.
//!
//! - [`DataAccess`]: typed CRUD calls that always answer with one
//!   [`Envelope`].
//! - [`StoreAccess`]: in-process implementation over a
//!   [`docgate_store::DocumentStore`].
//! - [`ApiClient`]: HTTP implementation talking to the docgate API.
//! - [`CollectionsAdapter`]: exposes the facade as MCP tools through the
//!   [`Adapter`] trait.

pub mod access;
pub mod api_client;
pub mod collections;
pub mod envelope;
pub mod error;
pub mod traits;

pub use access::{DEFAULT_QUERY_LIMIT, DataAccess, INFO_SAMPLE_SIZE, StoreAccess};
pub use api_client::{ApiClient, ApiClientConfig, DEFAULT_API_URL};
pub use collections::CollectionsAdapter;
pub use envelope::{Envelope, Status};
pub use error::{AdapterError, Result};
pub use traits::{Adapter, HealthStatus, ToolDefinition};
