//! The provider client contract.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use baton_core::TokenCallback;

/// Provider errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Minimal client interface consumed by the planner, the verifier and the
/// LLM-backed tools.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a raw planning response for a strict JSON prompt.
    async fn generate_plan(&self, prompt: &str) -> Result<String, LlmError>;

    /// Generate free-form text.
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;

    /// Ask the model to judge an output; returns the raw verdict text, which
    /// the caller parses leniently.
    async fn verify(&self, prompt: &str, output: &str) -> Result<String, LlmError> {
        self.generate_text(&format!("{}\nOutput to judge:\n{}", prompt, output))
            .await
    }

    /// Stream text chunks to `on_delta` and return the full text. The
    /// default replays a non-streaming completion token by token.
    async fn generate_text_stream(
        &self,
        prompt: &str,
        on_delta: TokenCallback,
    ) -> Result<String, LlmError> {
        let full = self.generate_text(prompt).await?;
        for token in full.split_inclusive(char::is_whitespace) {
            if !token.is_empty() {
                on_delta(token.to_string());
            }
        }
        Ok(full)
    }
}

#[async_trait]
impl LlmClient for Arc<dyn LlmClient> {
    async fn generate_plan(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate_plan(prompt).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate_text(prompt).await
    }

    async fn verify(&self, prompt: &str, output: &str) -> Result<String, LlmError> {
        (**self).verify(prompt, output).await
    }

    async fn generate_text_stream(
        &self,
        prompt: &str,
        on_delta: TokenCallback,
    ) -> Result<String, LlmError> {
        (**self).generate_text_stream(prompt, on_delta).await
    }
}
