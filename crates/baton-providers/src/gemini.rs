//! Gemini generateContent client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::client::{LlmClient, LlmError};
use crate::http::send_with_retry;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
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

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}],
            }],
        });
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&body);
        let text = send_with_retry(request, "gemini").await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Serialization(e.to_string()))?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::Response("no candidates".to_string()))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate_plan(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await
    }
}
