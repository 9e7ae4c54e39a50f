//! # Baton Providers
//!
//! Language-model provider clients behind one trait: OpenAI, Anthropic and
//! Gemini over plain HTTP, plus a deterministic mock used whenever no
//! provider is configured. Selection happens once at boot via `from_env`.

mod anthropic;
mod client;
mod factory;
mod gemini;
mod http;
mod mock;
mod openai;

pub use anthropic::AnthropicClient;
pub use client::{LlmClient, LlmError};
pub use factory::{from_env, ProviderKind};
pub use gemini::GeminiClient;
pub use mock::MockClient;
pub use openai::OpenAiClient;
