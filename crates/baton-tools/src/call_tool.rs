use std::sync::Weak;

use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput, ToolRegistry};

use crate::params::str_input;

/// Meta-tool delegating execution to another registered tool, letting a
/// planner emit a uniform single-tool plan. Inputs: `{tool, inputs}`.
/// Recursion into `call_tool` itself is blocked.
pub struct CallTool {
    registry: Weak<ToolRegistry>,
}

impl CallTool {
    pub fn new(registry: Weak<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Tool for CallTool {
    fn name(&self) -> &str {
        "call_tool"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| ToolError::failed("tool registry not available"))?;
        let name = str_input(inputs, "tool")
            .filter(|n| !n.is_empty())
            .ok_or(ToolError::MissingInput("tool name"))?;
        if name == self.name() {
            return Err(ToolError::failed(format!(
                "recursive call to {:?} is not allowed",
                self.name()
            )));
        }
        let delegate = registry
            .get(name)
            .ok_or_else(|| ToolError::failed(format!("unknown tool: {}", name)))?;

        let child_inputs = inputs
            .get("inputs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let out = delegate.execute(ctx, &child_inputs).await?;
        let logs = if out.logs.is_empty() {
            format!("delegated={}", name)
        } else {
            format!("delegated={} {}", name, out.logs)
        };
        Ok(ToolOutput::new(out.output).with_logs(logs))
    }
}
