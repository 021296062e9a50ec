//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers.  The collections API talks to `access`; the MCP endpoint
//! dispatches to `mcp`.

use std::sync::Arc;

use docgate_adapters::{Adapter, DataAccess};

use crate::WebConfig;
use crate::mcp::McpServer;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Data access facade behind the collections API.
    pub access: Arc<dyn DataAccess>,

    /// MCP server over the registered tool adapters.
    pub mcp: Arc<McpServer>,

    /// Web server configuration.
    pub config: WebConfig,
}

impl AppState {
    pub fn new(
        config: WebConfig,
        access: Arc<dyn DataAccess>,
        adapters: Vec<Arc<dyn Adapter>>,
    ) -> Self {
        Self {
            access,
            mcp: Arc::new(McpServer::new(adapters)),
            config,
        }
    }
}
