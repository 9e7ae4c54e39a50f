//! The tool contract.
//!
//! Tools are black boxes to the executor: they receive resolved inputs by
//! value, may stream incremental text through the run context, and report
//! either an output plus diagnostics or an error.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

// Re-export for convenience; the whole pipeline shares one cancellation type.
pub use tokio_util::sync::CancellationToken;

/// Receives incremental text chunks from a streaming tool.
pub type TokenCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Per-invocation context threaded through planner, executor, verifier and
/// tools: a cancellation token plus an optional token sink.
#[derive(Clone, Default)]
pub struct RunContext {
    pub cancel: CancellationToken,
    pub on_token: Option<TokenCallback>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to an existing cancellation token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            on_token: None,
        }
    }

    /// Attach a token sink for streaming tools.
    pub fn with_token_callback(mut self, on_token: TokenCallback) -> Self {
        self.on_token = Some(on_token);
        self
    }

    /// Forward a chunk to the token sink, if one is installed.
    pub fn emit_token(&self, chunk: impl Into<String>) {
        if let Some(on_token) = &self.on_token {
            on_token(chunk.into());
        }
    }
}

/// Tool execution errors; the executor captures these into the step result
/// rather than propagating them.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing {0}")]
    MissingInput(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Failed(String),
    #[error("cancelled")]
    Cancelled,
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Successful tool outcome: a JSON-serializable output and short diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub output: Value,
    pub logs: String,
}

impl ToolOutput {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            logs: String::new(),
        }
    }

    /// Convenience for the common string-output case.
    pub fn text(output: impl Into<String>) -> Self {
        Self::new(Value::String(output.into()))
    }

    pub fn with_logs(mut self, logs: impl Into<String>) -> Self {
        self.logs = logs.into();
        self
    }
}

/// A named, side-effecting function conforming to the tool contract.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key; must be unique.
    fn name(&self) -> &str;

    /// Execute with fully resolved inputs. Implementations must not retain
    /// references to the inputs beyond the call.
    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_token_without_sink_is_noop() {
        let ctx = RunContext::new();
        ctx.emit_token("ignored");
    }

    #[test]
    fn test_emit_token_forwards_chunks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ctx = RunContext::new()
            .with_token_callback(Arc::new(move |chunk| sink.lock().unwrap().push(chunk)));
        ctx.emit_token("a");
        ctx.emit_token("b");
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
