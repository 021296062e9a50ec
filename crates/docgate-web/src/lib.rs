//! HTTP surface of docgate.
//!
//! This crate serves two things:
//!
//! - The collections API: JSON CRUD endpoints over a
//!   [`docgate_adapters::DataAccess`] (`/collections/...`, `/health`).
//! - An MCP (Model Context Protocol) endpoint exposing registered
//!   adapters as tools, over HTTP (`POST /mcp`) or stdio.

pub mod api;
pub mod error;
pub mod mcp;
pub mod server;
pub mod state;

pub use error::WebError;
pub use mcp::McpServer;
pub use server::{ServerMode, WebServer};
pub use state::AppState;

/// Default port of the collections API.
pub const DEFAULT_API_PORT: u16 = 8001;

/// Default port of the standalone MCP server.
pub const DEFAULT_MCP_PORT: u16 = 8000;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: DEFAULT_API_PORT,
        }
    }
}
