//! Step result type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of executing one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Back-reference to the step that produced this result
    pub step_id: String,
    /// Tool output; `Null` when the tool failed before producing one
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub output: Value,
    /// Short free-form diagnostics from the tool
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logs: String,
    /// Whether the verifier accepted this result
    pub verified: bool,
    /// Execution error, empty on success
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Reserved for a future retry policy; never incremented today
    pub retries: u32,
}

impl StepResult {
    /// Create an unverified result carrying a tool output.
    pub fn new(step_id: impl Into<String>, output: Value, logs: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            output,
            logs: logs.into(),
            verified: false,
            error: String::new(),
            retries: 0,
        }
    }

    /// Create a failed result with no output.
    pub fn failed(step_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            output: Value::Null,
            logs: String::new(),
            verified: false,
            error: error.into(),
            retries: 0,
        }
    }

    /// Whether the execution itself reported an error.
    pub fn is_err(&self) -> bool {
        !self.error.is_empty()
    }
}
