//! Verifier contract and the rule-based verifier.

use async_trait::async_trait;
use serde_json::Value;

use baton_core::{RunContext, Step, StepResult, Task};

/// Outcome of judging one step result.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub ok: bool,
    pub reason: String,
}

impl Verdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Judges a step result; a failing verdict fails the whole task.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        ctx: &RunContext,
        task: &Task,
        step: &Step,
        result: &StepResult,
    ) -> Verdict;
}

/// Basic checks: execution errors fail, echo output must contain its input,
/// anything else passes on a non-null output.
pub struct BasicVerifier;

#[async_trait]
impl Verifier for BasicVerifier {
    async fn verify(
        &self,
        _ctx: &RunContext,
        _task: &Task,
        step: &Step,
        result: &StepResult,
    ) -> Verdict {
        if result.is_err() {
            return Verdict::fail("execution error returned");
        }
        if step.tool == "echo" {
            let text = step
                .inputs
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let output = result.output.as_str().unwrap_or_default();
            if !output.is_empty() && output.contains(text) {
                return Verdict::pass("ok");
            }
            return Verdict::fail("echo output mismatch");
        }
        if result.output.is_null() {
            Verdict::fail("empty output")
        } else {
            Verdict::pass("ok")
        }
    }
}
