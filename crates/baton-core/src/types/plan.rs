//! Plan type definitions

use serde::{Deserialize, Serialize};

use super::Step;

/// An ordered sequence of steps, owned by a task.
///
/// Immutable after the task reaches `PLANNED`; only each step's status
/// mutates during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    /// Create a plan from ordered steps.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
