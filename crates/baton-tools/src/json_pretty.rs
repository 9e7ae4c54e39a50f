use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::str_input;

/// Validates and pretty-prints a JSON string.
pub struct JsonPrettyTool;

#[async_trait]
impl Tool for JsonPrettyTool {
    fn name(&self) -> &str {
        "json_pretty"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let raw = str_input(inputs, "json")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ToolError::MissingInput("json"))?;
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ToolError::invalid(format!("invalid json: {}", e)))?;
        let pretty = serde_json::to_string_pretty(&value)
            .map_err(|e| ToolError::failed(e.to_string()))?;
        Ok(ToolOutput::text(pretty))
    }
}
