//! Executor contract and the registry-consulting implementation.
//!
//! The executor never propagates errors to the orchestrator loop: an
//! unknown tool or a failing tool is captured into the step result's
//! `error` field and handled as a failed step.

use std::sync::Arc;

use async_trait::async_trait;

use baton_core::{RunContext, Step, StepResult, ToolRegistry};

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, ctx: &RunContext, step: &Step) -> StepResult;
}

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Executor for ToolExecutor {
    async fn execute(&self, ctx: &RunContext, step: &Step) -> StepResult {
        let Some(tool) = self.registry.get(&step.tool) else {
            return StepResult::failed(&step.id, format!("unknown tool: {}", step.tool));
        };
        match tool.execute(ctx, &step.inputs).await {
            Ok(out) => StepResult::new(&step.id, out.output, out.logs),
            Err(err) => StepResult::failed(&step.id, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::{Tool, ToolError, ToolOutput};
    use serde_json::{json, Map, Value};

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        async fn execute(
            &self,
            _ctx: &RunContext,
            inputs: &Map<String, Value>,
        ) -> Result<ToolOutput, ToolError> {
            let text = inputs
                .get("text")
                .and_then(Value::as_str)
                .ok_or(ToolError::MissingInput("text"))?;
            Ok(ToolOutput::text(text.to_uppercase()).with_logs("upper"))
        }
    }

    fn executor() -> ToolExecutor {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(UpperTool));
        ToolExecutor::new(registry)
    }

    #[test]
    fn test_executes_registered_tool() {
        tokio_test::block_on(async {
            let step = Step::new("step1", "upper").with_input("text", "abc");
            let result = executor().execute(&RunContext::new(), &step).await;
            assert!(!result.is_err());
            assert_eq!(result.output, json!("ABC"));
            assert_eq!(result.logs, "upper");
            assert!(!result.verified);
        });
    }

    #[test]
    fn test_unknown_tool_is_captured_as_error() {
        tokio_test::block_on(async {
            let step = Step::new("step1", "nope");
            let result = executor().execute(&RunContext::new(), &step).await;
            assert_eq!(result.error, "unknown tool: nope");
            assert!(result.output.is_null());
        });
    }

    #[test]
    fn test_tool_error_is_captured_not_propagated() {
        tokio_test::block_on(async {
            let step = Step::new("step1", "upper");
            let result = executor().execute(&RunContext::new(), &step).await;
            assert_eq!(result.error, "missing text");
            assert_eq!(result.step_id, "step1");
        });
    }
}
