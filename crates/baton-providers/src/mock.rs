//! Deterministic mock client, used whenever no real provider is configured.

use async_trait::async_trait;

use crate::client::{LlmClient, LlmError};

const MAX_ECHO_CHARS: usize = 120;

pub struct MockClient;

#[async_trait]
impl LlmClient for MockClient {
    async fn generate_plan(&self, prompt: &str) -> Result<String, LlmError> {
        let p = prompt.to_lowercase();
        if p.contains("http") || p.contains("url") {
            Ok(r#"[{"id":"step1","description":"HTTP GET a URL","tool":"http_get","inputs":{"url":"<from-query>"}}]"#.to_string())
        } else {
            Ok(r#"[{"id":"step1","description":"Echo the query","tool":"echo","inputs":{"text":"<from-query>"}}]"#.to_string())
        }
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        let head: String = prompt.chars().take(MAX_ECHO_CHARS).collect();
        Ok(format!("(mock) {}", head))
    }

    async fn verify(&self, _prompt: &str, output: &str) -> Result<String, LlmError> {
        if output.trim().is_empty() {
            Ok(String::new())
        } else {
            Ok("ok".to_string())
        }
    }
}
