use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use baton_core::{RunContext, Tool, ToolError, ToolOutput};
use baton_providers::LlmClient;

use crate::params::str_input;

/// Summarizes text with the configured model, streaming tokens when the run
/// context carries a sink.
pub struct SummarizeTool {
    client: Arc<dyn LlmClient>,
}

impl SummarizeTool {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

pub(crate) fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following text in a concise way (3-5 bullet points or a short paragraph). Focus on key facts.\n\nText:\n{}",
        text
    )
}

#[async_trait]
impl Tool for SummarizeTool {
    fn name(&self) -> &str {
        "summarize"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let text = str_input(inputs, "text")
            .filter(|t| !t.is_empty())
            .ok_or(ToolError::MissingInput("text"))?;
        let prompt = summary_prompt(text);
        let summary = match &ctx.on_token {
            Some(on_token) => self
                .client
                .generate_text_stream(&prompt, on_token.clone())
                .await,
            None => self.client.generate_text(&prompt).await,
        }
        .map_err(|e| ToolError::failed(e.to_string()))?;
        Ok(ToolOutput::text(summary))
    }
}
