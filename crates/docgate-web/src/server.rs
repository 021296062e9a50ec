//! Web server setup and startup.
//!
//! [`WebServer`] composes the Axum router for one of two roles and starts
//! the HTTP listener:
//!
//! - [`ServerMode::Api`]: the collections API plus `POST /mcp`.
//! - [`ServerMode::Mcp`]: only `POST /mcp` and `GET /health`, for the
//!   standalone tool server that forwards to a remote API.

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use docgate_adapters::{Adapter, DataAccess};

use crate::WebConfig;
use crate::api;
use crate::error::WebError;
use crate::mcp;
use crate::state::AppState;

/// Which set of routes a [`WebServer`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Api,
    Mcp,
}

/// The docgate web server.
pub struct WebServer {
    mode: ServerMode,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address and port configuration.
    /// * `mode` - Which routes to register.
    /// * `access` - The data access facade behind `/collections` and `/health`.
    /// * `adapters` - The tool adapters exposed over MCP.
    pub fn new(
        config: WebConfig,
        mode: ServerMode,
        access: Arc<dyn DataAccess>,
        adapters: Vec<Arc<dyn Adapter>>,
    ) -> Self {
        let state = Arc::new(AppState::new(config, access, adapters));
        Self { mode, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        let config = &self.state.config;
        format!("{}:{}", config.bind_addr, config.port)
    }

    /// Build the Axum router with all routes of the configured mode.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);

        let routes = Router::new()
            .route("/health", get(api::health))
            .route("/mcp", post(mcp::handle_mcp_request));

        let routes = match self.mode {
            ServerMode::Mcp => routes,
            ServerMode::Api => routes
                .route("/collections", get(api::list_collections))
                .route("/collections/query", post(api::query))
                .route("/collections/insert", post(api::insert))
                .route("/collections/update", post(api::update))
                .route("/collections/delete", post(api::delete))
                .route("/collections/export", post(api::export))
                .route("/collections/{name}/info", get(api::collection_info)),
        };

        routes.layer(cors).with_state(Arc::clone(&self.state))
    }

    /// Bind the configured address and serve until shut down.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Bind`] if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), WebError> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| WebError::Bind {
                addr: addr.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), WebError> {
        let local = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.addr());
        tracing::info!(addr = %local, mode = ?self.mode, "starting web server");

        let router = self.router();
        axum::serve(listener, router)
            .await
            .map_err(WebError::Serve)
    }
}
