//! OpenAI chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{LlmClient, LlmError};
use crate::http::send_with_retry;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    content: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
        }
    }

    async fn chat(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [ChatMessage { role: "user", content: prompt }],
            "temperature": temperature,
        });
        let request = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body);
        let text = send_with_retry(request, "openai").await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Serialization(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Response("no choices".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate_plan(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(prompt, 0.2).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(prompt, 0.3).await
    }

    async fn verify(&self, prompt: &str, output: &str) -> Result<String, LlmError> {
        self.chat(&format!("{}\nOutput to judge:\n{}", prompt, output), 0.0)
            .await
    }
}
