//! Step type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Status;

fn default_status() -> Status {
    Status::Pending
}

/// One tool invocation intent inside a plan.
///
/// `deps` expresses ordering to the planner; the executor itself follows
/// plan order and treats `deps` as informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier within the plan, conventionally `step1`, `step2`…
    pub id: String,
    /// Human-readable description of the step
    #[serde(default)]
    pub description: String,
    /// Ids of earlier steps this step depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    /// Registered tool name
    pub tool: String,
    /// Tool inputs; string values may carry `{{step:ID.output}}` templates
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Current lifecycle status
    #[serde(default = "default_status")]
    pub status: Status,
}

impl Step {
    /// Create a pending step for a tool.
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            deps: Vec::new(),
            tool: tool.into(),
            inputs: Map::new(),
            status: Status::Pending,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare dependencies on earlier steps.
    pub fn with_deps(mut self, deps: Vec<String>) -> Self {
        self.deps = deps;
        self
    }

    /// Add one input value.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Replace the whole input map.
    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }
}
