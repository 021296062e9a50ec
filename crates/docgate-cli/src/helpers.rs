//! Shared helpers for the subcommands.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docgate_adapters::{Adapter, ApiClient, CollectionsAdapter, DataAccess, StoreAccess};
use docgate_intent::{CommandAdapter, CommandInterpreter};
use docgate_store::{Database, DocumentStore};

use crate::config::{Config, StoreSettings};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`.  With `to_stderr` set, logs stay
/// off stdout, which the stdio MCP transport owns.
pub fn init_tracing(default_level: &str, to_stderr: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    if to_stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Open (creating if needed) the on-disk store and run migrations.
pub async fn open_store(settings: &StoreSettings) -> Result<DocumentStore> {
    if let Some(parent) = settings.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let db = Database::open_and_migrate(settings.path.clone())
        .await
        .with_context(|| format!("failed to open database {}", settings.path.display()))?;
    info!(path = %settings.path.display(), "store initialized");

    Ok(DocumentStore::new(db))
}

/// Data access over the local store.
pub async fn local_access(config: &Config) -> Result<Arc<dyn DataAccess>> {
    let store = open_store(&config.store).await?;
    Ok(Arc::new(StoreAccess::new(
        store,
        config.store.database_name.clone(),
    )))
}

/// Data access forwarding to the configured collections API.
pub fn remote_access(config: &Config) -> Result<Arc<dyn DataAccess>> {
    let client = ApiClient::new(config.api_client()).context("invalid bridge configuration")?;
    info!(
        api_url = %client.base_url(),
        enabled = config.bridge.enabled,
        "API bridge configured"
    );
    Ok(Arc::new(client))
}

/// The tool adapters exposed over MCP: collection CRUD plus `smart_command`.
pub fn build_adapters(access: Arc<dyn DataAccess>) -> Result<Vec<Arc<dyn Adapter>>> {
    let interpreter = CommandInterpreter::new(access.clone())
        .context("failed to build command interpreter")?;

    Ok(vec![
        Arc::new(CollectionsAdapter::new("collections", access)),
        Arc::new(CommandAdapter::new("command", Arc::new(interpreter))),
    ])
}
