//! Subcommand: `docgate command` -- one-shot or interactive commands.

use std::io::Write as _;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use docgate_adapters::{Envelope, Status};
use docgate_intent::CommandInterpreter;

use crate::config::Config;
use crate::helpers::{local_access, remote_access};

const PROMPT: &str = "docgate> ";

/// Run `words` as a single command, or read commands from stdin until EOF
/// or `exit` when no words are given.
pub async fn cmd_command(config: &Config, words: Vec<String>, local: bool) -> Result<()> {
    let access = if local {
        local_access(config).await?
    } else {
        remote_access(config)?
    };
    let interpreter =
        CommandInterpreter::new(access).context("failed to build command interpreter")?;

    if !words.is_empty() {
        let reply = interpreter.interpret(&words.join(" ")).await;
        println!("{}", render(&reply));
        return Ok(());
    }

    println!("Type a command (\"exit\" to quit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let reply = interpreter.interpret(line).await;
        println!("{}", render(&reply));
    }
    Ok(())
}

/// Human-readable form of a command reply.
///
/// Errors print as `Error: ...`; a message and a table print as-is; any
/// other payload falls back to pretty JSON.
pub fn render(reply: &Envelope) -> String {
    if reply.status == Status::Error {
        return format!("Error: {}", reply.error_message().unwrap_or("unknown error"));
    }

    let message = reply.get("message").and_then(Value::as_str);
    let table = reply.get("table").and_then(Value::as_str);
    match (message, table) {
        (Some(m), Some(t)) => format!("{m}\n{t}"),
        (Some(m), None) => m.to_owned(),
        (None, Some(t)) => t.to_owned(),
        (None, None) => serde_json::to_string_pretty(&reply.payload)
            .unwrap_or_else(|_| format!("{:?}", reply.payload)),
    }
}
