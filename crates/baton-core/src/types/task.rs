//! Task type definitions
//!
//! Task is the aggregate root: it carries the original query, the optional
//! plan, and every step result produced so far. All state lives in memory
//! for the lifetime of the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Plan, StepResult};

/// Lifecycle status shared by tasks and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Planned,
    Running,
    Success,
    Failed,
}

impl Status {
    /// Terminal statuses are set at most once per task.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Success | Status::Failed)
    }
}

/// A single user request traversing plan → execute → verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier for this task
    pub id: String,
    /// The original free-form query
    pub query: String,
    /// Optional structured context (attachments, opaque payloads)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    /// Current lifecycle status
    pub status: Status,
    /// The plan, once a planner produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    /// Step results appended in plan order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<StepResult>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with a fresh id.
    pub fn new(query: impl Into<String>, context: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            context,
            status: Status::Pending,
            plan: None,
            results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the status and the `updated_at` stamp.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        self.touch();
    }

    /// Attach the plan.
    pub fn set_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
        self.touch();
    }

    /// Append a step result in plan order.
    pub fn push_result(&mut self, result: StepResult) {
        self.results.push(result);
        self.touch();
    }

    /// Refresh the `updated_at` stamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Cheap listing projection of this task.
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            query: self.query.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Listing projection: no plan, no results, no context.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub query: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
