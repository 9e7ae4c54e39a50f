//! # Baton Config
//!
//! Environment-driven configuration. Every knob has a default; malformed
//! values fall back to the default rather than failing boot.

use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PREVIEW_MAX_BYTES: usize = 20_000;
const DEFAULT_LLM_TIMEOUT_MS: u64 = 45_000;

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port (`PORT`)
    pub port: u16,
    /// Preview truncation threshold in bytes (`PREVIEW_MAX_BYTES`)
    pub preview_max_bytes: usize,
    /// Use the model-backed planner (`USE_LLM_PLANNER=1`)
    pub use_llm_planner: bool,
    /// Use the model-backed verifier (`USE_LLM_VERIFIER=1`)
    pub use_llm_verifier: bool,
    /// Planner wraps steps in the `call_tool` meta-tool (`USE_UNIFIED_TOOL=1`)
    pub use_unified_tool: bool,
    pub llm: LlmConfig,
    pub tools: ToolCaps,
}

/// Provider selection knobs. API keys are read by the provider factory
/// itself and never stored here.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Provider override (`LLM_PROVIDER` ∈ openai|anthropic|gemini)
    pub provider: Option<String>,
    /// Model override (`LLM_MODEL`)
    pub model: Option<String>,
    /// Request timeout (`LLM_HTTP_TIMEOUT_MS`)
    pub timeout: Duration,
}

/// Per-tool resource caps.
#[derive(Debug, Clone)]
pub struct ToolCaps {
    /// `HTTP_GET_MAX_BYTES`, default 2 MiB
    pub http_get_max_bytes: usize,
    /// `PDF_MAX_BYTES`, default 20 MiB
    pub pdf_max_bytes: usize,
    /// `PDF_MAX_PAGES`, default 20
    pub pdf_max_pages: usize,
    /// `PDF_TIMEOUT_MS`, default 60 s
    pub pdf_timeout: Duration,
    /// `FILE_MAX_BYTES`, default 20 MiB
    pub file_max_bytes: usize,
    /// `CHUNK_CHARS`, default 8000
    pub chunk_chars: usize,
    /// `CHUNK_OVERLAP`, default 400
    pub chunk_overlap: usize,
    /// `CHUNK_MAX_PAR`, default 3
    pub chunk_max_parallel: usize,
}

impl Default for ToolCaps {
    fn default() -> Self {
        Self {
            http_get_max_bytes: 2 << 20,
            pdf_max_bytes: 20 * 1024 * 1024,
            pdf_max_pages: 20,
            pdf_timeout: Duration::from_millis(60_000),
            file_max_bytes: 20 * 1024 * 1024,
            chunk_chars: 8_000,
            chunk_overlap: 400,
            chunk_max_parallel: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            preview_max_bytes: DEFAULT_PREVIEW_MAX_BYTES,
            use_llm_planner: false,
            use_llm_verifier: false,
            use_unified_tool: false,
            llm: LlmConfig {
                provider: None,
                model: None,
                timeout: Duration::from_millis(DEFAULT_LLM_TIMEOUT_MS),
            },
            tools: ToolCaps::default(),
        }
    }
}

impl Config {
    /// Read the whole configuration from the process environment.
    pub fn from_env() -> Self {
        let defaults = ToolCaps::default();
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            preview_max_bytes: env_parse("PREVIEW_MAX_BYTES", DEFAULT_PREVIEW_MAX_BYTES),
            use_llm_planner: env_flag("USE_LLM_PLANNER"),
            use_llm_verifier: env_flag("USE_LLM_VERIFIER"),
            use_unified_tool: env_flag("USE_UNIFIED_TOOL"),
            llm: LlmConfig {
                provider: env_string("LLM_PROVIDER"),
                model: env_string("LLM_MODEL"),
                timeout: Duration::from_millis(env_parse(
                    "LLM_HTTP_TIMEOUT_MS",
                    DEFAULT_LLM_TIMEOUT_MS,
                )),
            },
            tools: ToolCaps {
                http_get_max_bytes: env_parse("HTTP_GET_MAX_BYTES", defaults.http_get_max_bytes),
                pdf_max_bytes: env_parse("PDF_MAX_BYTES", defaults.pdf_max_bytes),
                pdf_max_pages: env_parse("PDF_MAX_PAGES", defaults.pdf_max_pages),
                pdf_timeout: Duration::from_millis(env_parse(
                    "PDF_TIMEOUT_MS",
                    defaults.pdf_timeout.as_millis() as u64,
                )),
                file_max_bytes: env_parse("FILE_MAX_BYTES", defaults.file_max_bytes),
                chunk_chars: env_parse("CHUNK_CHARS", defaults.chunk_chars),
                chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
                chunk_max_parallel: env_parse("CHUNK_MAX_PAR", defaults.chunk_max_parallel),
            },
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| v.trim() == "1").unwrap_or(false)
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
