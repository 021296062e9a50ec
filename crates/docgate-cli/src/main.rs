//! CLI entry point for docgate.
//!
//! This binary provides the `docgate` command with subcommands for serving
//! the collections API, running the MCP tool server, issuing plain-English
//! commands and checking status.

mod cli;
mod config;
mod helpers;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use docgate_adapters::{DataAccess, Status};
use docgate_web::mcp::serve_stdio;
use docgate_web::{McpServer, ServerMode, WebConfig, WebServer};

use crate::cli::{Cli, Commands, Transport};
use crate::config::Config;
use crate::helpers::{build_adapters, init_tracing, local_access, remote_access};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let stdio = matches!(
        cli.command,
        Commands::Mcp {
            transport: Transport::Stdio,
            ..
        }
    );
    init_tracing("info", stdio);

    let config = Config::load();

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(&config, bind, port).await,
        Commands::Mcp {
            transport,
            host,
            port,
        } => cmd_mcp(&config, transport, host, port).await,
        Commands::Command { text, local } => repl::cmd_command(&config, text, local).await,
        Commands::Status => cmd_status(&config).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config: &Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let access = local_access(config).await?;
    let adapters = build_adapters(access.clone())?;

    let server = WebServer::new(config.web(bind, port), ServerMode::Api, access, adapters);
    info!(
        addr = %server.addr(),
        database = %config.store.database_name,
        "collections API starting"
    );
    server.start().await.context("collections API failed")
}

// ---------------------------------------------------------------------------
// Subcommand: mcp
// ---------------------------------------------------------------------------

async fn cmd_mcp(
    config: &Config,
    transport: Transport,
    host: Option<String>,
    port: u16,
) -> Result<()> {
    let access = remote_access(config)?;
    let adapters = build_adapters(access.clone())?;

    match transport {
        Transport::Stdio => {
            let server = McpServer::new(adapters);
            serve_stdio(
                &server,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await
            .context("MCP stdio transport failed")
        }
        Transport::Http => {
            let web = WebConfig {
                bind_addr: host.unwrap_or_else(|| config.server.bind.clone()),
                port,
            };
            let server = WebServer::new(web, ServerMode::Mcp, access, adapters);
            info!(addr = %server.addr(), "MCP server starting");
            server.start().await.context("MCP server failed")
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(config: &Config) -> Result<()> {
    println!("docgate v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Store:     {}", config.store.path.display());
    println!("  Database:  {}", config.store.database_name);
    println!("  API bind:  {}:{}", config.server.bind, config.server.port);
    println!(
        "  Bridge:    {} ({})",
        config.bridge.api_url,
        if config.bridge.enabled { "enabled" } else { "disabled" }
    );
    println!();

    let local = if config.store.path.exists() {
        let access = local_access(config).await?;
        describe(access.health().await.status)
    } else {
        "not created yet"
    };
    println!("  Local store: {local}");

    let remote = if config.bridge.enabled {
        let access = remote_access(config)?;
        let reply = access.health().await;
        match reply.error_message() {
            Some(e) if !reply.is_success() => format!("{} ({e})", describe(reply.status)),
            _ => describe(reply.status).to_owned(),
        }
    } else {
        "disabled".to_owned()
    };
    println!("  API:         {remote}");

    Ok(())
}

fn describe(status: Status) -> &'static str {
    match status {
        Status::Success | Status::Healthy => "healthy",
        Status::Error | Status::Unhealthy => "unhealthy",
    }
}
