//! Model-backed verifier with lenient verdict parsing.

use async_trait::async_trait;
use serde_json::{json, Value};

use baton_core::{stringify_output, RunContext, Step, StepResult, Task};
use baton_providers::LlmClient;

use crate::verifier::{Verdict, Verifier};

pub struct LlmVerifier<C: LlmClient> {
    client: C,
}

impl<C: LlmClient> LlmVerifier<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

fn build_verify_prompt(task: &Task, step: &Step) -> String {
    let subject = json!({
        "query": task.query,
        "context": task.context,
        "step": step,
    });
    format!(
        "You are a strict verifier. Given the task and step, return whether the output satisfies the step's intent and is relevant.\nRespond with JSON: {{\"ok\": true|false, \"reason\": \"...\"}}.\nTask and step: {}",
        subject
    )
}

/// Lenient parsing: an explicit boolean `ok` wins; otherwise any non-empty
/// response counts as a pass.
fn parse_verdict(raw: &str) -> Verdict {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        if let Some(ok) = value.get("ok").and_then(Value::as_bool) {
            let reason = value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Verdict { ok, reason };
        }
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Verdict::fail("empty verifier response")
    } else {
        Verdict::pass(trimmed)
    }
}

#[async_trait]
impl<C: LlmClient> Verifier for LlmVerifier<C> {
    async fn verify(
        &self,
        _ctx: &RunContext,
        task: &Task,
        step: &Step,
        result: &StepResult,
    ) -> Verdict {
        if result.is_err() {
            return Verdict::fail("execution error");
        }
        let prompt = build_verify_prompt(task, step);
        let output = stringify_output(&result.output);
        match self.client.verify(&prompt, &output).await {
            Ok(raw) => parse_verdict(&raw),
            Err(err) => Verdict::fail(err.to_string()),
        }
    }
}
