//! CLI argument definitions for docgate.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use clap::{Parser, Subcommand, ValueEnum};

use docgate_web::DEFAULT_MCP_PORT;

/// docgate -- a document store behind an HTTP API, a command interpreter
/// and an MCP tool server.
#[derive(Parser)]
#[command(
    name = "docgate",
    version,
    about = "docgate -- document collections over HTTP and MCP",
    long_about = "Serves JSON document collections over a CRUD HTTP API, interprets \
                  plain-English commands against employee records, and exposes both \
                  as MCP tools."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the collections API over the local store.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Start the MCP tool server, forwarding to the collections API.
    Mcp {
        /// How MCP clients connect.
        #[arg(long, short, value_enum, default_value_t = Transport::Http)]
        transport: Transport,

        /// Address to bind to (HTTP transport only).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (HTTP transport only).
        #[arg(long, short, default_value_t = DEFAULT_MCP_PORT)]
        port: u16,
    },

    /// Run a plain-English command, or start a prompt if none is given.
    Command {
        /// The command text, e.g. "who owns Honda Shine".
        text: Vec<String>,

        /// Use the local store instead of the collections API.
        #[arg(long)]
        local: bool,
    },

    /// Show configuration and backend health.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Http,
    Stdio,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn mcp_defaults() {
        let cli = Cli::try_parse_from(["docgate", "mcp"]).unwrap();
        let Commands::Mcp {
            transport,
            host,
            port,
        } = cli.command
        else {
            panic!("expected mcp");
        };
        assert_eq!(transport, Transport::Http);
        assert_eq!(host, None);
        assert_eq!(port, 8000);
    }

    #[test]
    fn command_words_are_collected() {
        let cli =
            Cli::try_parse_from(["docgate", "command", "--local", "who", "owns", "activa"]).unwrap();
        let Commands::Command { text, local } = cli.command else {
            panic!("expected command");
        };
        assert!(local);
        assert_eq!(text.join(" "), "who owns activa");
    }

    #[test]
    fn stdio_transport_parses() {
        let cli = Cli::try_parse_from(["docgate", "mcp", "--transport", "stdio"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Mcp {
                transport: Transport::Stdio,
                ..
            }
        ));
    }
}
