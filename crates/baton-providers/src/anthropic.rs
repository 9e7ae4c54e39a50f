//! Anthropic messages-API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::client::{LlmClient, LlmError};
use crate::http::send_with_retry;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout,
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": prompt}],
            }],
        });
        let request = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(self.timeout)
            .json(&body);
        let text = send_with_retry(request, "anthropic").await?;
        let parsed: MessagesResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Serialization(e.to_string()))?;
        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| LlmError::Response("no content".to_string()))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate_plan(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_response_parsing() {
        let raw = r#"{"content":[{"type":"text","text":"hi there"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text, "hi there");
    }

    #[test]
    fn test_default_endpoint() {
        let client = AnthropicClient::new("key", "model", None, Duration::from_secs(1));
        assert_eq!(client.endpoint, DEFAULT_ENDPOINT);
    }
}
