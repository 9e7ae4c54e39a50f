//! Bounded result previews for the wire.
//!
//! Events and task fetches never carry full outputs: a preview truncates the
//! stringified output to a byte budget and records the pre-truncation size,
//! so clients can decide whether to fetch the full result separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{Plan, Status, StepResult, Task};

/// Wire-safe projection of a step result.
#[derive(Debug, Clone, Serialize)]
pub struct ResultPreview {
    pub step_id: String,
    pub output: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logs: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub retries: u32,
    /// Size of the stringified output before truncation
    pub bytes_total: usize,
    pub preview_truncated: bool,
}

/// Wire-safe projection of a task: results replaced by previews.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPreview {
    pub id: String,
    pub query: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ResultPreview>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stringify an output the way the wire sees it: strings verbatim, null as
/// empty, anything else as compact JSON. The full-result endpoint serves
/// exactly these bytes.
pub fn render_output(output: &Value) -> String {
    match output {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build a preview of one result under the given byte budget.
pub fn preview_result(result: &StepResult, max_bytes: usize) -> ResultPreview {
    let full = render_output(&result.output);
    let bytes_total = full.len();
    let (output, preview_truncated) = truncate_utf8(full, max_bytes);
    ResultPreview {
        step_id: result.step_id.clone(),
        output,
        logs: result.logs.clone(),
        verified: result.verified,
        error: result.error.clone(),
        retries: result.retries,
        bytes_total,
        preview_truncated,
    }
}

/// Build a preview of a whole task.
pub fn preview_task(task: &Task, max_bytes: usize) -> TaskPreview {
    TaskPreview {
        id: task.id.clone(),
        query: task.query.clone(),
        context: task.context.clone(),
        status: task.status,
        plan: task.plan.clone(),
        results: task
            .results
            .iter()
            .map(|r| preview_result(r, max_bytes))
            .collect(),
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

fn truncate_utf8(s: String, max_bytes: usize) -> (String, bool) {
    if s.len() <= max_bytes {
        return (s, false);
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    (s[..end].to_string(), true)
}
