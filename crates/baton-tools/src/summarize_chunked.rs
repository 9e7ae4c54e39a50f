use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::{Map, Value};

use baton_config::ToolCaps;
use baton_core::{RunContext, Tool, ToolError, ToolOutput};
use baton_providers::LlmClient;

use crate::params::{str_input, usize_input};
use crate::summarize::summary_prompt;

const MIN_CHUNK_CHARS: usize = 1_000;
const DEFAULT_REDUCE_INSTRUCTIONS: &str = "Combine the following section summaries into a single clear summary (bullets or short paragraphs). Avoid repetition; preserve critical details.";

/// Map/reduce summarization for large texts: each chunk is summarized with
/// bounded parallelism, then the section summaries are reduced into one
/// final summary. Only the reduce phase streams.
pub struct SummarizeChunkedTool {
    client: Arc<dyn LlmClient>,
    chunk_chars: usize,
    overlap_chars: usize,
    max_parallel: usize,
}

impl SummarizeChunkedTool {
    pub fn new(client: Arc<dyn LlmClient>, caps: &ToolCaps) -> Self {
        Self {
            client,
            chunk_chars: caps.chunk_chars,
            overlap_chars: caps.chunk_overlap,
            max_parallel: caps.chunk_max_parallel,
        }
    }
}

#[async_trait]
impl Tool for SummarizeChunkedTool {
    fn name(&self) -> &str {
        "summarize_chunked"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let text = str_input(inputs, "text")
            .filter(|t| !t.is_empty())
            .ok_or(ToolError::MissingInput("text"))?;
        let chunk_chars = usize_input(inputs, "chunk_chars")
            .unwrap_or(self.chunk_chars)
            .max(MIN_CHUNK_CHARS);
        let overlap = usize_input(inputs, "overlap_chars").unwrap_or(self.overlap_chars);
        let max_parallel = usize_input(inputs, "max_parallel")
            .unwrap_or(self.max_parallel)
            .max(1);

        let parts = split_chunks(text, chunk_chars, overlap);
        if parts.len() == 1 {
            // Small text: plain single-pass summarization.
            let prompt = summary_prompt(text);
            let summary = match &ctx.on_token {
                Some(on_token) => self
                    .client
                    .generate_text_stream(&prompt, on_token.clone())
                    .await,
                None => self.client.generate_text(&prompt).await,
            }
            .map_err(|e| ToolError::failed(e.to_string()))?;
            return Ok(ToolOutput::text(summary));
        }

        // Map phase: summarize each section, at most `max_parallel` in flight.
        let total = parts.len();
        let sections: Vec<String> = stream::iter(parts.into_iter().enumerate().map(|(i, part)| {
            let client = self.client.clone();
            async move {
                let prompt = format!(
                    "Summarize this section into 3-5 concise bullets focusing on key facts.\n\nSection {}/{}:\n{}",
                    i + 1,
                    total,
                    part
                );
                client.generate_text(&prompt).await
            }
        }))
        .buffered(max_parallel)
        .try_collect()
        .await
        .map_err(|e| ToolError::failed(e.to_string()))?;

        // Reduce phase: stream the final combination.
        let reduce_instructions = str_input(inputs, "reduce_instructions")
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REDUCE_INSTRUCTIONS);
        let mut combined = String::new();
        for (i, section) in sections.iter().enumerate() {
            combined.push_str(&format!("\n\n[Section {}]\n{}", i + 1, section));
        }
        let prompt = format!("{}\n\nSummaries:{}", reduce_instructions, combined);
        let summary = match &ctx.on_token {
            Some(on_token) => self
                .client
                .generate_text_stream(&prompt, on_token.clone())
                .await,
            None => self.client.generate_text(&prompt).await,
        }
        .map_err(|e| ToolError::failed(e.to_string()))?;
        let logs = format!("chunks={} chunk_chars={}", total, chunk_chars);
        Ok(ToolOutput::text(summary).with_logs(logs))
    }
}

/// Split text into character chunks with overlap between neighbours.
pub(crate) fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next <= start { end } else { next };
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_providers::MockClient;
    use serde_json::json;

    #[test]
    fn test_split_chunks_with_overlap() {
        let text = "abcdefghij";
        let chunks = split_chunks(text, 4, 1);
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_split_chunks_no_overlap() {
        assert_eq!(split_chunks("abcdef", 3, 0), vec!["abc", "def"]);
    }

    #[test]
    fn test_split_chunks_small_text_is_one_chunk() {
        assert_eq!(split_chunks("short", 100, 10), vec!["short"]);
    }

    #[test]
    fn test_split_chunks_overlap_never_stalls() {
        // Overlap >= size must still make progress.
        let chunks = split_chunks("abcdefgh", 2, 5);
        assert_eq!(chunks, vec!["ab", "cd", "ef", "gh"]);
    }

    #[test]
    fn test_small_input_takes_single_pass() {
        tokio_test::block_on(async {
            let tool = SummarizeChunkedTool::new(Arc::new(MockClient), &ToolCaps::default());
            let inputs = json!({"text": "tiny"});
            let out = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap();
            assert!(out.output.as_str().unwrap().starts_with("(mock)"));
            assert!(out.logs.is_empty());
        });
    }

    #[test]
    fn test_large_input_maps_then_reduces() {
        tokio_test::block_on(async {
            let tool = SummarizeChunkedTool::new(Arc::new(MockClient), &ToolCaps::default());
            let inputs = json!({
                "text": "x".repeat(2_500),
                "chunk_chars": 1000,
                "overlap_chars": 0
            });
            let out = tool
                .execute(&RunContext::new(), inputs.as_object().unwrap())
                .await
                .unwrap();
            assert_eq!(out.logs, "chunks=3 chunk_chars=1000");
            assert!(out.output.as_str().unwrap().starts_with("(mock)"));
        });
    }
}
