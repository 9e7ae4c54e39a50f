//! Planner contract and the rule-based heuristic planner.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use baton_core::{Plan, RunContext, Step, Task};

/// Planner errors.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("llm error: {0}")]
    Llm(String),
    #[error("failed to generate plan: {0}")]
    Generation(String),
}

/// Turns a task's query and context into an ordered plan of tool steps.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, ctx: &RunContext, task: &Task) -> Result<Plan, PlanError>;
}

/// Pure rule-based planner. Branch priority: PDF context, attachments,
/// URL-looking queries, then a single direct-answer step.
#[derive(Clone)]
pub struct HeuristicPlanner {
    answer_tool: String,
}

impl Default for HeuristicPlanner {
    fn default() -> Self {
        Self::new()
    }
}

struct Attachment {
    filename: String,
    content_type: String,
    data_base64: String,
}

impl HeuristicPlanner {
    pub fn new() -> Self {
        Self {
            answer_tool: "echo".to_string(),
        }
    }

    /// Tool used for the default "answer directly" branch; `llm_answer`
    /// when a real model is wired, `echo` otherwise.
    pub fn with_answer_tool(mut self, tool: impl Into<String>) -> Self {
        self.answer_tool = tool.into();
        self
    }

    pub(crate) fn plan_for(&self, task: &Task) -> Plan {
        if let Some(data) = task.context.get("pdf_base64").and_then(Value::as_str) {
            return pdf_plan(&task.query, data);
        }
        if let Some(attachment) = first_attachment(task) {
            return attachment_plan(&task.query, &attachment);
        }
        // Deliberately loose URL detection: the substring match also fires
        // on queries that merely mention "http".
        if task.query.to_lowercase().contains("http") {
            return url_plan(&task.query);
        }
        Plan::new(vec![Step::new("step1", &self.answer_tool)
            .with_description("Answer the query directly")
            .with_input("text", task.query.clone())])
    }
}

#[async_trait]
impl Planner for HeuristicPlanner {
    async fn plan(&self, _ctx: &RunContext, task: &Task) -> Result<Plan, PlanError> {
        Ok(self.plan_for(task))
    }
}

fn wants_summary(query: &str) -> bool {
    let q = query.to_lowercase();
    q.trim().is_empty() || q.contains("summar")
}

fn pdf_plan(query: &str, data_base64: &str) -> Plan {
    let extract = Step::new("step1", "pdf_extract")
        .with_description("Extract text from the attached PDF")
        .with_input("data_base64", data_base64.to_string());
    let follow_up = if wants_summary(query) {
        Step::new("step2", "summarize")
            .with_description("Summarize the extracted document")
            .with_deps(vec!["step1".to_string()])
            .with_input("text", "{{step:step1.output}}")
    } else {
        Step::new("step2", "llm_answer")
            .with_description("Answer the query using the document")
            .with_deps(vec!["step1".to_string()])
            .with_input("question", query.to_string())
            .with_input(
                "instructions",
                "Use the following extracted document content to answer.\n\n{{step:step1.output}}",
            )
    };
    Plan::new(vec![extract, follow_up])
}

fn first_attachment(task: &Task) -> Option<Attachment> {
    let first = task
        .context
        .get("attachments")
        .and_then(Value::as_array)?
        .first()?;
    Some(Attachment {
        filename: first
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content_type: first
            .get("content_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        data_base64: first
            .get("data_base64")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn attachment_plan(query: &str, attachment: &Attachment) -> Plan {
    let filename = attachment.filename.to_lowercase();
    let content_type = attachment.content_type.to_lowercase();
    let extract = Step::new("step1", "file_extract")
        .with_description("Extract text from the attachment")
        .with_input("data_base64", attachment.data_base64.clone())
        .with_input("filename", attachment.filename.clone())
        .with_input("content_type", attachment.content_type.clone());
    let question = if query.trim().is_empty() {
        "Describe this data.".to_string()
    } else {
        query.to_string()
    };

    if filename.ends_with(".csv") || content_type.contains("csv") {
        return Plan::new(vec![
            extract,
            Step::new("step2", "csv_parse")
                .with_description("Parse the CSV content")
                .with_deps(vec!["step1".to_string()])
                .with_input("csv", "{{step:step1.output}}"),
            Step::new("step3", "llm_answer")
                .with_description("Answer the query using the parsed rows")
                .with_deps(vec!["step2".to_string()])
                .with_input("question", question)
                .with_input(
                    "instructions",
                    "Use the following parsed CSV rows to answer.\n\n{{step:step2.output}}",
                ),
        ]);
    }
    if filename.ends_with(".json") || content_type.contains("json") {
        return Plan::new(vec![
            extract,
            Step::new("step2", "json_pretty")
                .with_description("Validate and pretty-print the JSON")
                .with_deps(vec!["step1".to_string()])
                .with_input("json", "{{step:step1.output}}"),
            Step::new("step3", "llm_answer")
                .with_description("Answer the query using the JSON document")
                .with_deps(vec!["step2".to_string()])
                .with_input("question", question)
                .with_input(
                    "instructions",
                    "Use the following JSON document to answer.\n\n{{step:step2.output}}",
                ),
        ]);
    }
    Plan::new(vec![
        extract,
        Step::new("step2", "summarize")
            .with_description("Summarize the extracted text")
            .with_deps(vec!["step1".to_string()])
            .with_input("text", "{{step:step1.output}}"),
    ])
}

pub(crate) fn url_plan(query: &str) -> Plan {
    Plan::new(vec![
        Step::new("step1", "http_get")
            .with_description("HTTP GET a URL")
            .with_input("url", query.to_string()),
        Step::new("step2", "html_to_text")
            .with_description("Convert HTML to text")
            .with_deps(vec!["step1".to_string()])
            .with_input("html", "{{step:step1.output}}"),
        Step::new("step3", "summarize")
            .with_description("Summarize content")
            .with_deps(vec!["step2".to_string()])
            .with_input("text", "{{step:step2.output}}"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::Status;
    use serde_json::{json, Map};

    fn task(query: &str) -> Task {
        Task::new(query, Map::new())
    }

    fn task_with_context(query: &str, context: Value) -> Task {
        Task::new(query, context.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_plain_query_answers_with_echo_by_default() {
        let plan = HeuristicPlanner::new().plan_for(&task("hello"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].tool, "echo");
        assert_eq!(plan.steps[0].inputs.get("text"), Some(&json!("hello")));
        assert_eq!(plan.steps[0].status, Status::Pending);
    }

    #[test]
    fn test_answer_tool_is_configurable() {
        let planner = HeuristicPlanner::new().with_answer_tool("llm_answer");
        let plan = planner.plan_for(&task("hello"));
        assert_eq!(plan.steps[0].tool, "llm_answer");
    }

    #[test]
    fn test_url_query_chains_fetch_to_summary() {
        let plan = HeuristicPlanner::new().plan_for(&task("https://example.com"));
        let tools: Vec<&str> = plan.steps.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(tools, vec!["http_get", "html_to_text", "summarize"]);
        assert_eq!(
            plan.steps[0].inputs.get("url"),
            Some(&json!("https://example.com"))
        );
        assert_eq!(
            plan.steps[1].inputs.get("html"),
            Some(&json!("{{step:step1.output}}"))
        );
        assert_eq!(plan.steps[2].deps, vec!["step2".to_string()]);
    }

    #[test]
    fn test_url_detector_misfires_on_the_word_http() {
        // Known quirk, preserved: a query merely mentioning "http" takes
        // the fetch branch.
        let plan = HeuristicPlanner::new().plan_for(&task("what does http stand for?"));
        assert_eq!(plan.steps[0].tool, "http_get");
    }

    #[test]
    fn test_pdf_context_plans_extract_then_summarize() {
        let task = task_with_context("summarize this", json!({"pdf_base64": "QUJD"}));
        let plan = HeuristicPlanner::new().plan_for(&task);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].tool, "pdf_extract");
        assert_eq!(plan.steps[1].tool, "summarize");
        assert_eq!(
            plan.steps[1].inputs.get("text"),
            Some(&json!("{{step:step1.output}}"))
        );
    }

    #[test]
    fn test_pdf_context_with_question_answers_from_document() {
        let task = task_with_context("who wrote it?", json!({"pdf_base64": "QUJD"}));
        let plan = HeuristicPlanner::new().plan_for(&task);
        assert_eq!(plan.steps[1].tool, "llm_answer");
        assert_eq!(
            plan.steps[1].inputs.get("question"),
            Some(&json!("who wrote it?"))
        );
    }

    #[test]
    fn test_csv_attachment_takes_the_csv_flow() {
        let task = task_with_context(
            "average age?",
            json!({"attachments": [{"filename": "people.csv", "data_base64": "QUJD"}]}),
        );
        let plan = HeuristicPlanner::new().plan_for(&task);
        let tools: Vec<&str> = plan.steps.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(tools, vec!["file_extract", "csv_parse", "llm_answer"]);
    }

    #[test]
    fn test_json_attachment_takes_the_json_flow() {
        let task = task_with_context(
            "",
            json!({"attachments": [{"filename": "data.json", "data_base64": "QUJD"}]}),
        );
        let plan = HeuristicPlanner::new().plan_for(&task);
        let tools: Vec<&str> = plan.steps.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(tools, vec!["file_extract", "json_pretty", "llm_answer"]);
        assert_eq!(
            plan.steps[2].inputs.get("question"),
            Some(&json!("Describe this data."))
        );
    }

    #[test]
    fn test_generic_attachment_is_summarized() {
        let task = task_with_context(
            "notes",
            json!({"attachments": [{"filename": "notes.txt", "data_base64": "QUJD"}]}),
        );
        let plan = HeuristicPlanner::new().plan_for(&task);
        let tools: Vec<&str> = plan.steps.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(tools, vec!["file_extract", "summarize"]);
    }

    #[test]
    fn test_pdf_context_takes_priority_over_url() {
        let task = task_with_context("http://x summarize", json!({"pdf_base64": "QUJD"}));
        let plan = HeuristicPlanner::new().plan_for(&task);
        assert_eq!(plan.steps[0].tool, "pdf_extract");
    }
}
