use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};

use crate::params::str_input;

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let text = str_input(inputs, "text").unwrap_or_default();
        Ok(ToolOutput::text(format!("echo: {}", text)))
    }
}
