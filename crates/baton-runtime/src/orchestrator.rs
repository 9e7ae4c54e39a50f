//! The task engine: owns the in-memory task table, drives the
//! plan → execute → verify loop, and publishes progress through the hub.
//!
//! Execution is strictly sequential in plan order; `Step.deps` is
//! informational to the planner. A failing or unverified step stops the
//! loop and fails the task; earlier results are preserved.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use baton_core::{
    preview_result, resolve_inputs, Plan, RunContext, Status, Task, TaskSummary,
};

use crate::executor::Executor;
use crate::hub::{Event, EventHub, EventKind, Subscription};
use crate::planner::{PlanError, Planner};
use crate::verifier::Verifier;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("no plan to execute")]
    NoPlan,
    #[error(transparent)]
    Planner(#[from] PlanError),
}

pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    executor: Arc<dyn Executor>,
    verifier: Arc<dyn Verifier>,
    hub: Arc<EventHub>,
    preview_max_bytes: usize,
    tasks: RwLock<HashMap<String, Task>>,
    cancels: Mutex<HashMap<String, CancellationToken>>,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        executor: Arc<dyn Executor>,
        verifier: Arc<dyn Verifier>,
        hub: Arc<EventHub>,
        preview_max_bytes: usize,
    ) -> Self {
        Self {
            planner,
            executor,
            verifier,
            hub,
            preview_max_bytes,
            tasks: RwLock::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn preview_max_bytes(&self) -> usize {
        self.preview_max_bytes
    }

    /// Create a pending task and announce it.
    pub async fn create_task(&self, query: impl Into<String>, context: Map<String, Value>) -> Task {
        let task = Task::new(query, context);
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        tracing::info!(task_id = %task.id, "task created");
        self.hub.publish(Event::new(
            EventKind::TaskStatus,
            &task.id,
            json!({"status": task.status}),
        ));
        task
    }

    /// Value copy of a task.
    pub async fn get_task(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    /// Summaries of every task, oldest first.
    pub async fn list_tasks(&self) -> Vec<TaskSummary> {
        let tasks = self.tasks.read().await;
        let mut summaries: Vec<TaskSummary> = tasks.values().map(Task::summary).collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// Subscribe to the event stream of one task.
    pub fn subscribe(&self, task_id: &str) -> Subscription {
        self.hub.subscribe(task_id)
    }

    /// Plan then execute. Fails at the planning step when the planner
    /// errors; no steps run in that case.
    pub async fn start(&self, id: &str) -> Result<(), OrchestratorError> {
        self.update_status(id, Status::Running, None).await?;
        let snapshot = self
            .get_task(id)
            .await
            .ok_or_else(|| OrchestratorError::TaskNotFound(id.to_string()))?;

        let cancel = self.register_cancel(id);
        let ctx = RunContext::with_cancel(cancel.clone());
        let plan = match self.planner.plan(&ctx, &snapshot).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::error!(task_id = %id, error = %err, "planning failed");
                let _ = self
                    .update_status(id, Status::Failed, Some(&err.to_string()))
                    .await;
                self.clear_cancel(id);
                return Err(err.into());
            }
        };
        self.store_plan(id, &plan).await;
        self.hub.publish(Event::new(
            EventKind::Plan,
            id,
            serde_json::to_value(&plan).unwrap_or(Value::Null),
        ));
        self.run_steps(id, cancel).await;
        Ok(())
    }

    /// Compute and store a plan without executing, for review.
    pub async fn plan_only(&self, id: &str) -> Result<Plan, OrchestratorError> {
        let snapshot = self
            .get_task(id)
            .await
            .ok_or_else(|| OrchestratorError::TaskNotFound(id.to_string()))?;
        let ctx = RunContext::new();
        let plan = match self.planner.plan(&ctx, &snapshot).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::error!(task_id = %id, error = %err, "planning failed");
                let _ = self
                    .update_status(id, Status::Failed, Some(&err.to_string()))
                    .await;
                return Err(err.into());
            }
        };
        self.store_plan(id, &plan).await;
        self.hub.publish(Event::new(
            EventKind::Plan,
            id,
            serde_json::to_value(&plan).unwrap_or(Value::Null),
        ));
        self.update_status(id, Status::Planned, None).await?;
        Ok(plan)
    }

    /// Execute a previously stored plan.
    pub async fn execute_plan(&self, id: &str) -> Result<(), OrchestratorError> {
        {
            let tasks = self.tasks.read().await;
            let task = tasks
                .get(id)
                .ok_or_else(|| OrchestratorError::TaskNotFound(id.to_string()))?;
            if task.plan.as_ref().map(Plan::is_empty).unwrap_or(true) {
                return Err(OrchestratorError::NoPlan);
            }
        }
        self.update_status(id, Status::Running, None).await?;
        let cancel = self.register_cancel(id);
        self.run_steps(id, cancel).await;
        Ok(())
    }

    /// Cancel a running task's execute context. Returns whether a running
    /// task was found. Client disconnects never reach this path.
    pub fn cancel(&self, id: &str) -> bool {
        let cancels = self.cancels.lock();
        match cancels.get(id) {
            Some(token) => {
                token.cancel();
                tracing::info!(task_id = %id, "task cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Full, untruncated output of one executed step.
    pub async fn step_output(&self, task_id: &str, step_id: &str) -> Option<Value> {
        let tasks = self.tasks.read().await;
        tasks
            .get(task_id)?
            .results
            .iter()
            .find(|r| r.step_id == step_id)
            .map(|r| r.output.clone())
    }

    async fn run_steps(&self, id: &str, cancel: CancellationToken) {
        let appender = self.hub.token_appender(id);
        let (snapshot, steps) = {
            let tasks = self.tasks.read().await;
            match tasks.get(id) {
                Some(task) => (
                    task.clone(),
                    task.plan
                        .as_ref()
                        .map(|p| p.steps.clone())
                        .unwrap_or_default(),
                ),
                None => {
                    self.hub.stop_token_appender(id);
                    self.clear_cancel(id);
                    return;
                }
            }
        };

        let mut outputs: HashMap<String, Value> = HashMap::new();
        for index in 0..steps.len() {
            // Working copy; the stored plan only ever changes step status.
            let mut step = steps[index].clone();
            step.status = Status::Running;
            self.set_step_status(id, index, Status::Running).await;
            self.publish_step(id, &step);

            step.inputs = resolve_inputs(&step.inputs, &outputs);
            let ctx = RunContext::with_cancel(cancel.clone())
                .with_token_callback(appender.step_callback(&step.id));

            let mut result = self.executor.execute(&ctx, &step).await;
            let verdict = self.verifier.verify(&ctx, &snapshot, &step, &result).await;
            result.verified = verdict.ok;

            if !verdict.ok || result.is_err() {
                tracing::warn!(
                    task_id = %id,
                    step_id = %step.id,
                    tool = %step.tool,
                    reason = %verdict.reason,
                    error = %result.error,
                    "step failed"
                );
                step.status = Status::Failed;
                self.publish_result(id, &result);
                {
                    let mut tasks = self.tasks.write().await;
                    if let Some(task) = tasks.get_mut(id) {
                        if let Some(stored) =
                            task.plan.as_mut().and_then(|p| p.steps.get_mut(index))
                        {
                            stored.status = Status::Failed;
                        }
                        task.push_result(result);
                    }
                }
                self.publish_step(id, &step);
                self.hub.stop_token_appender(id);
                let _ = self.update_status(id, Status::Failed, None).await;
                self.clear_cancel(id);
                return;
            }

            result.verified = true;
            outputs.insert(step.id.clone(), result.output.clone());
            step.status = Status::Success;
            self.publish_result(id, &result);
            {
                let mut tasks = self.tasks.write().await;
                if let Some(task) = tasks.get_mut(id) {
                    if let Some(stored) = task.plan.as_mut().and_then(|p| p.steps.get_mut(index)) {
                        stored.status = Status::Success;
                    }
                    task.push_result(result);
                }
            }
            self.publish_step(id, &step);
            tracing::info!(task_id = %id, step_id = %step.id, tool = %step.tool, "step succeeded");
        }

        self.hub.stop_token_appender(id);
        let _ = self.update_status(id, Status::Success, None).await;
        self.clear_cancel(id);
    }

    async fn store_plan(&self, id: &str, plan: &Plan) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(id) {
            task.set_plan(plan.clone());
        }
    }

    async fn set_step_status(&self, id: &str, index: usize, status: Status) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(id) {
            if let Some(step) = task.plan.as_mut().and_then(|p| p.steps.get_mut(index)) {
                step.status = status;
            }
            task.touch();
        }
    }

    async fn update_status(
        &self,
        id: &str,
        status: Status,
        error: Option<&str>,
    ) -> Result<(), OrchestratorError> {
        {
            let mut tasks = self.tasks.write().await;
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| OrchestratorError::TaskNotFound(id.to_string()))?;
            task.set_status(status);
        }
        let mut payload = json!({"status": status});
        if let Some(error) = error {
            payload["error"] = json!(error);
        }
        self.hub
            .publish(Event::new(EventKind::TaskStatus, id, payload));
        Ok(())
    }

    fn publish_step(&self, id: &str, step: &baton_core::Step) {
        self.hub.publish(Event::new(
            EventKind::StepStatus,
            id,
            serde_json::to_value(step).unwrap_or(Value::Null),
        ));
    }

    fn publish_result(&self, id: &str, result: &baton_core::StepResult) {
        let preview = preview_result(result, self.preview_max_bytes);
        self.hub.publish(Event::new(
            EventKind::Result,
            id,
            serde_json::to_value(&preview).unwrap_or(Value::Null),
        ));
    }

    fn register_cancel(&self, id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.cancels.lock().insert(id.to_string(), token.clone());
        token
    }

    fn clear_cancel(&self, id: &str) {
        self.cancels.lock().remove(id);
    }
}
