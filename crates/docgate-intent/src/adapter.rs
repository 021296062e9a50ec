//! The `smart_command` tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use docgate_adapters::{Adapter, AdapterError, HealthStatus, ToolDefinition};

use crate::interpreter::CommandInterpreter;

/// Exposes [`CommandInterpreter`] as a single tool.
pub struct CommandAdapter {
    id: String,
    interpreter: Arc<CommandInterpreter>,
}

impl CommandAdapter {
    pub fn new(id: impl Into<String>, interpreter: Arc<CommandInterpreter>) -> Self {
        Self {
            id: id.into(),
            interpreter,
        }
    }
}

#[async_trait]
impl Adapter for CommandAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn health_check(&self) -> docgate_adapters::Result<HealthStatus> {
        Ok(HealthStatus::Healthy)
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "smart_command".into(),
            description: "Run a plain-English command against the employee records, e.g. \
                          'who owns Honda Shine', 'list employees', \
                          'show engineers from Thane above 60000', \
                          'add new engineer named Rohan in Pune with salary 85000'"
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The command text"
                    }
                },
                "required": ["command"]
            }),
        }]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> docgate_adapters::Result<Value> {
        if name != "smart_command" {
            return Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_owned(),
            });
        }
        let command = params
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::InvalidParams {
                tool_name: name.to_owned(),
                reason: "missing required string field `command`".into(),
            })?;
        Ok(self.interpreter.interpret(command).await.into_value())
    }
}
