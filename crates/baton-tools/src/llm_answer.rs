use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};
use baton_providers::LlmClient;

use crate::params::str_input;

/// Answers a free-form question with the configured model.
pub struct LlmAnswerTool {
    client: Arc<dyn LlmClient>,
}

impl LlmAnswerTool {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for LlmAnswerTool {
    fn name(&self) -> &str {
        "llm_answer"
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        // Accept either "text" or "question".
        let question = str_input(inputs, "text")
            .filter(|t| !t.is_empty())
            .or_else(|| str_input(inputs, "question").filter(|q| !q.is_empty()))
            .ok_or(ToolError::MissingInput("text/question"))?;
        let prompt = match str_input(inputs, "instructions").filter(|i| !i.is_empty()) {
            Some(instructions) => format!("{}\n\nQuestion:\n{}", instructions, question),
            None => question.to_string(),
        };
        let answer = self
            .client
            .generate_text(&prompt)
            .await
            .map_err(|e| ToolError::failed(e.to_string()))?;
        Ok(ToolOutput::text(answer))
    }
}
