//! Boot-time provider selection.
//!
//! `LLM_PROVIDER` wins when set and its key is present; otherwise the first
//! configured API key (OpenAI → Anthropic → Gemini) decides; otherwise the
//! deterministic mock.

use std::env;
use std::sync::Arc;

use baton_config::LlmConfig;

use crate::anthropic::AnthropicClient;
use crate::client::LlmClient;
use crate::gemini::GeminiClient;
use crate::mock::MockClient;
use crate::openai::OpenAiClient;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Which provider was selected at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Mock => "mock",
        }
    }

    /// Whether a real model backs this provider.
    pub fn is_real(&self) -> bool {
        !matches!(self, ProviderKind::Mock)
    }
}

/// Build a client from the environment. Falls back to the mock when no key
/// is configured.
pub fn from_env(config: &LlmConfig) -> (ProviderKind, Arc<dyn LlmClient>) {
    let selected = select(config);
    tracing::info!(provider = selected.0.as_str(), "llm provider selected");
    selected
}

fn select(config: &LlmConfig) -> (ProviderKind, Arc<dyn LlmClient>) {
    let provider = config
        .provider
        .as_deref()
        .map(|p| p.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match provider.as_str() {
        "openai" => {
            if let Some(client) = openai_from_env(config) {
                return (ProviderKind::OpenAi, client);
            }
        }
        "anthropic" => {
            if let Some(client) = anthropic_from_env(config) {
                return (ProviderKind::Anthropic, client);
            }
        }
        "gemini" => {
            if let Some(client) = gemini_from_env(config) {
                return (ProviderKind::Gemini, client);
            }
        }
        _ => {}
    }

    // Auto-detect by key presence when no provider (or a keyless one) is set.
    if let Some(client) = openai_from_env(config) {
        return (ProviderKind::OpenAi, client);
    }
    if let Some(client) = anthropic_from_env(config) {
        return (ProviderKind::Anthropic, client);
    }
    if let Some(client) = gemini_from_env(config) {
        return (ProviderKind::Gemini, client);
    }
    (ProviderKind::Mock, Arc::new(MockClient))
}

fn openai_from_env(config: &LlmConfig) -> Option<Arc<dyn LlmClient>> {
    let key = nonempty_env("OPENAI_API_KEY")?;
    Some(Arc::new(OpenAiClient::new(
        key,
        model_or(config, DEFAULT_OPENAI_MODEL),
        nonempty_env("OPENAI_API_BASE"),
        config.timeout,
    )))
}

fn anthropic_from_env(config: &LlmConfig) -> Option<Arc<dyn LlmClient>> {
    let key = nonempty_env("ANTHROPIC_API_KEY")?;
    Some(Arc::new(AnthropicClient::new(
        key,
        model_or(config, DEFAULT_ANTHROPIC_MODEL),
        nonempty_env("ANTHROPIC_API_URL"),
        config.timeout,
    )))
}

fn gemini_from_env(config: &LlmConfig) -> Option<Arc<dyn LlmClient>> {
    let key = nonempty_env("GOOGLE_API_KEY")?;
    Some(Arc::new(GeminiClient::new(
        key,
        model_or(config, DEFAULT_GEMINI_MODEL),
        nonempty_env("GEMINI_API_URL"),
        config.timeout,
    )))
}

fn model_or(config: &LlmConfig, default: &str) -> String {
    config
        .model
        .clone()
        .unwrap_or_else(|| default.to_string())
}

fn nonempty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
