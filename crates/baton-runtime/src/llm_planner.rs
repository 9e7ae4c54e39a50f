//! Model-backed planner with defensive output parsing.
//!
//! The model is asked for a bare JSON array of step objects. Responses are
//! parsed leniently: code fences are stripped, then a direct parse, then the
//! first balanced `[ ]` block, then a `{"steps": [...]}` wrapper. Anything
//! unusable falls back to the heuristic plan rather than failing the task.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use baton_core::{Plan, RunContext, Step, Task};
use baton_providers::LlmClient;

use crate::planner::{HeuristicPlanner, PlanError, Planner};

const MAX_CONTEXT_PROMPT_CHARS: usize = 2_000;

pub struct LlmPlanner<C: LlmClient> {
    client: C,
    fallback: HeuristicPlanner,
    unified_tool: bool,
}

#[derive(Debug, Deserialize)]
struct LlmStep {
    #[serde(default)]
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tool: String,
    #[serde(default)]
    inputs: Map<String, Value>,
    #[serde(default)]
    deps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StepsWrapper {
    steps: Vec<LlmStep>,
}

impl<C: LlmClient> LlmPlanner<C> {
    pub fn new(client: C, fallback: HeuristicPlanner) -> Self {
        Self {
            client,
            fallback,
            unified_tool: false,
        }
    }

    /// Rewrite every planned step through the `call_tool` meta-tool, so the
    /// executor sees a single uniform tool name.
    pub fn with_unified_tool(mut self, unified_tool: bool) -> Self {
        self.unified_tool = unified_tool;
        self
    }

    fn build_prompt(&self, task: &Task) -> String {
        let context = truncate_chars(
            &serde_json::to_string(&task.context).unwrap_or_default(),
            MAX_CONTEXT_PROMPT_CHARS,
        );
        format!(
            r#"You are a planning agent for a constrained tool runner.
Output ONLY a JSON array of step objects, no prose, no code fences.

Tools (you MUST stick to these):
- echo: inputs {{"text": string}}
- http_get: inputs {{"url": string}}
- summarize: inputs {{"text": string}}

Rules:
- Produce 1-3 ordered steps. Prefer 2 steps when helpful.
- Use "deps" to express order (e.g., step2 depends on step1).
- To pass the output of a previous step to a later step, set a string input to the exact template: {{{{step:ID.output}}}}
- If the query contains or implies a URL, first add an http_get step using that URL, then add a summarize step with {{"text": "{{{{step:step1.output}}}}"}} (adjust ID as needed) to produce a concise summary.
- If there is no URL, use 1-2 echo steps: first restate or clarify the intent; optionally add a second echo suggesting a next action.

Schema for each step: {{"id": "stepN", "description": "...", "tool": "echo"|"http_get"|"summarize", "inputs": {{ ... }}, "deps": ["stepK"]}}

User query: {}
Context: {}"#,
            task.query, context
        )
    }

    fn steps_from_response(&self, raw: &str) -> Option<Vec<LlmStep>> {
        let text = normalize_json_text(raw);
        if let Ok(steps) = serde_json::from_str::<Vec<LlmStep>>(&text) {
            return Some(steps);
        }
        if let Some(array) = extract_json_array(&text) {
            if let Ok(steps) = serde_json::from_str::<Vec<LlmStep>>(&array) {
                return Some(steps);
            }
        }
        serde_json::from_str::<StepsWrapper>(&text)
            .ok()
            .map(|wrapper| wrapper.steps)
    }

    fn build_plan(&self, steps: Vec<LlmStep>) -> Plan {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let id = if s.id.is_empty() {
                    format!("step{}", i + 1)
                } else {
                    s.id
                };
                Step::new(id, s.tool)
                    .with_description(s.description)
                    .with_deps(s.deps)
                    .with_inputs(s.inputs)
            })
            .collect();
        let plan = Plan::new(steps);
        if self.unified_tool {
            wrap_unified(plan)
        } else {
            plan
        }
    }
}

#[async_trait]
impl<C: LlmClient> Planner for LlmPlanner<C> {
    async fn plan(&self, _ctx: &RunContext, task: &Task) -> Result<Plan, PlanError> {
        let prompt = self.build_prompt(task);
        let raw = match self.client.generate_plan(&prompt).await {
            Ok(raw) if !raw.trim().is_empty() => raw,
            Ok(_) | Err(_) => {
                tracing::warn!(task_id = %task.id, "planner model unusable, falling back to heuristic plan");
                return Ok(self.fallback.plan_for(task));
            }
        };
        match self.steps_from_response(&raw) {
            Some(steps) if !steps.is_empty() => {
                let plan = self.build_plan(steps);
                tracing::info!(task_id = %task.id, step_count = plan.len(), "model plan parsed");
                Ok(plan)
            }
            _ => {
                tracing::warn!(task_id = %task.id, "model plan unparsable, falling back to heuristic plan");
                Ok(self.fallback.plan_for(task))
            }
        }
    }
}

/// Wrap every non-meta step in `call_tool`, preserving observable behavior.
fn wrap_unified(plan: Plan) -> Plan {
    let steps = plan
        .steps
        .into_iter()
        .map(|step| {
            if step.tool == "call_tool" {
                return step;
            }
            let mut inputs = Map::new();
            inputs.insert("tool".to_string(), json!(step.tool));
            inputs.insert("inputs".to_string(), Value::Object(step.inputs.clone()));
            Step::new(step.id, "call_tool")
                .with_description(step.description)
                .with_deps(step.deps)
                .with_inputs(inputs)
        })
        .collect();
    Plan::new(steps)
}

/// Strip code fences and, when the payload does not already start with an
/// array, try to cut the first balanced array out of surrounding prose.
fn normalize_json_text(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if let Some(stripped) = text.strip_prefix("```") {
        // Drop a possible language hint, e.g. ```json
        let stripped = match stripped.find('\n') {
            Some(i) => &stripped[i + 1..],
            None => stripped,
        };
        let stripped = match stripped.rfind("```") {
            Some(i) => &stripped[..i],
            None => stripped,
        };
        text = stripped.trim().to_string();
    }
    if !text.starts_with('[') {
        if let Some(array) = extract_json_array(&text) {
            return array;
        }
    }
    text
}

/// Crude extractor for the first top-level `[ ]` block.
fn extract_json_array(text: &str) -> Option<String> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(start) {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::Status;
    use baton_providers::{LlmError, MockClient};
    use serde_json::Map as JsonMap;

    struct CannedClient(&'static str);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn generate_plan(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn generate_plan(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Http("connection refused".to_string()))
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Http("connection refused".to_string()))
        }
    }

    fn planner<C: LlmClient>(client: C) -> LlmPlanner<C> {
        LlmPlanner::new(client, HeuristicPlanner::new())
    }

    fn task(query: &str) -> Task {
        Task::new(query, JsonMap::new())
    }

    async fn plan_with<C: LlmClient>(client: C, query: &str) -> Plan {
        planner(client)
            .plan(&RunContext::new(), &task(query))
            .await
            .expect("plan")
    }

    #[test]
    fn test_parses_direct_json_array() {
        tokio_test::block_on(async {
            let plan = plan_with(
                CannedClient(r#"[{"id":"step1","tool":"echo","inputs":{"text":"hi"}}]"#),
                "hi",
            )
            .await;
            assert_eq!(plan.len(), 1);
            assert_eq!(plan.steps[0].tool, "echo");
            assert_eq!(plan.steps[0].status, Status::Pending);
        });
    }

    #[test]
    fn test_strips_code_fences() {
        tokio_test::block_on(async {
            let raw = "```json\n[{\"id\":\"step1\",\"tool\":\"echo\",\"inputs\":{\"text\":\"x\"}}]\n```";
            let plan = plan_with(CannedClient(raw), "x").await;
            assert_eq!(plan.len(), 1);
            assert_eq!(plan.steps[0].tool, "echo");
        });
    }

    #[test]
    fn test_extracts_array_from_prose() {
        tokio_test::block_on(async {
            let plan = plan_with(
                CannedClient(
                    r#"Here is the plan: [{"id":"step1","tool":"echo","inputs":{}}] hope it helps"#,
                ),
                "x",
            )
            .await;
            assert_eq!(plan.len(), 1);
        });
    }

    #[test]
    fn test_accepts_steps_wrapper_object() {
        tokio_test::block_on(async {
            let plan = plan_with(
                CannedClient(r#"{"steps":[{"id":"step1","tool":"echo","inputs":{}}]}"#),
                "x",
            )
            .await;
            assert_eq!(plan.len(), 1);
            assert_eq!(plan.steps[0].tool, "echo");
        });
    }

    #[test]
    fn test_missing_ids_are_backfilled() {
        tokio_test::block_on(async {
            let plan = plan_with(
                CannedClient(r#"[{"tool":"echo","inputs":{}},{"tool":"summarize","inputs":{}}]"#),
                "x",
            )
            .await;
            assert_eq!(plan.steps[0].id, "step1");
            assert_eq!(plan.steps[1].id, "step2");
        });
    }

    #[test]
    fn test_garbage_falls_back_to_heuristic() {
        tokio_test::block_on(async {
            let plan = plan_with(CannedClient("the model refused to answer"), "hello").await;
            assert_eq!(plan.len(), 1);
            assert_eq!(plan.steps[0].tool, "echo");
        });
    }

    #[test]
    fn test_client_error_falls_back_to_heuristic() {
        tokio_test::block_on(async {
            let plan = plan_with(FailingClient, "https://example.com").await;
            let tools: Vec<&str> = plan.steps.iter().map(|s| s.tool.as_str()).collect();
            assert_eq!(tools, vec!["http_get", "html_to_text", "summarize"]);
        });
    }

    #[test]
    fn test_empty_array_falls_back_to_heuristic() {
        tokio_test::block_on(async {
            let plan = plan_with(CannedClient("[]"), "hello").await;
            assert_eq!(plan.steps[0].tool, "echo");
        });
    }

    #[test]
    fn test_unified_tool_wraps_steps() {
        tokio_test::block_on(async {
            let planner = LlmPlanner::new(
                CannedClient(r#"[{"id":"step1","tool":"http_get","inputs":{"url":"U"}}]"#),
                HeuristicPlanner::new(),
            )
            .with_unified_tool(true);
            let plan = planner
                .plan(&RunContext::new(), &task("x"))
                .await
                .expect("plan");
            assert_eq!(plan.steps[0].tool, "call_tool");
            assert_eq!(
                plan.steps[0].inputs.get("tool"),
                Some(&serde_json::json!("http_get"))
            );
            assert_eq!(
                plan.steps[0].inputs.get("inputs"),
                Some(&serde_json::json!({"url": "U"}))
            );
        });
    }

    #[test]
    fn test_mock_client_produces_echo_plan() {
        tokio_test::block_on(async {
            let plan = plan_with(MockClient, "say hello").await;
            assert_eq!(plan.steps[0].tool, "echo");
        });
    }

    #[test]
    fn test_extract_json_array_finds_first_balanced_block() {
        assert_eq!(extract_json_array("x [1,[2]] y [3]"), Some("[1,[2]]".to_string()));
        assert_eq!(extract_json_array("no array"), None);
        assert_eq!(extract_json_array("[unclosed"), None);
    }
}
