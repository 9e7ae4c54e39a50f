//! HTTP and SSE surface for the Baton tool runner.
//!
//! Routes follow the task lifecycle: create, plan, execute/start (async,
//! 202), fetch previews, stream events over SSE, and download full step
//! outputs. CORS is wide open; this is a dev-oriented backend.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use baton_config::Config;
use baton_core::{preview_task, render_output, Plan, Task, TaskPreview, TaskSummary, ToolRegistry};
use baton_providers::from_env as provider_from_env;
use baton_runtime::{
    BasicVerifier, EventHub, Executor, HeuristicPlanner, LlmPlanner, LlmVerifier, Orchestrator,
    OrchestratorError, Planner, ToolExecutor, Verifier,
};
use baton_tools::register_builtin_tools;

const SSE_PING_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }
}

/// Wire the whole runtime from configuration: provider, tools, planner,
/// verifier, executor, hub, orchestrator.
pub fn build_state(config: &Config) -> AppState {
    let (kind, client) = provider_from_env(&config.llm);

    let registry = Arc::new(ToolRegistry::new());
    register_builtin_tools(&registry, &config.tools, client.clone());

    let answer_tool = if kind.is_real() { "llm_answer" } else { "echo" };
    let heuristic = HeuristicPlanner::new().with_answer_tool(answer_tool);
    let planner: Arc<dyn Planner> = if config.use_llm_planner {
        Arc::new(
            LlmPlanner::new(client.clone(), heuristic.clone())
                .with_unified_tool(config.use_unified_tool),
        )
    } else {
        Arc::new(heuristic)
    };
    let verifier: Arc<dyn Verifier> = if config.use_llm_verifier {
        Arc::new(LlmVerifier::new(client))
    } else {
        Arc::new(BasicVerifier)
    };
    let executor: Arc<dyn Executor> = Arc::new(ToolExecutor::new(registry));

    let orchestrator = Arc::new(Orchestrator::new(
        planner,
        executor,
        verifier,
        Arc::new(EventHub::new()),
        config.preview_max_bytes,
    ));
    AppState { orchestrator }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task))
        .route("/tasks/plan/{id}", post(plan_task))
        .route("/tasks/execute/{id}", post(execute_task))
        .route("/tasks/start/{id}", post(start_task))
        .route("/tasks/cancel/{id}", post(cancel_task))
        .route("/tasks/{id}/events", get(stream_events))
        .route("/tasks/result/{id}/{step_id}", get(full_result))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            message: message.into(),
        }),
    )
}

fn task_not_found(id: &str) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("task not found: {}", id),
    )
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    query: String,
    #[serde(default)]
    context: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ResultQuery {
    #[serde(default)]
    download: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskSummary>> {
    Json(state.orchestrator.list_tasks().await)
}

async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> Json<Task> {
    let task = state
        .orchestrator
        .create_task(request.query, request.context)
        .await;
    Json(task)
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskPreview>, ApiError> {
    let task = state
        .orchestrator
        .get_task(&id)
        .await
        .ok_or_else(|| task_not_found(&id))?;
    Ok(Json(preview_task(
        &task,
        state.orchestrator.preview_max_bytes(),
    )))
}

async fn plan_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Plan>, ApiError> {
    match state.orchestrator.plan_only(&id).await {
        Ok(plan) => Ok(Json(plan)),
        Err(OrchestratorError::TaskNotFound(id)) => Err(task_not_found(&id)),
        Err(err) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "planner_error",
            err.to_string(),
        )),
    }
}

async fn start_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.get_task(&id).await.is_none() {
        return Err(task_not_found(&id));
    }
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(err) = orchestrator.start(&id).await {
            tracing::error!(task_id = %id, error = %err, "start failed");
        }
    });
    Ok(StatusCode::ACCEPTED)
}

async fn execute_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let task = state
        .orchestrator
        .get_task(&id)
        .await
        .ok_or_else(|| task_not_found(&id))?;
    if task.plan.as_ref().map(Plan::is_empty).unwrap_or(true) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "no_plan",
            "no plan to execute",
        ));
    }
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(err) = orchestrator.execute_plan(&id).await {
            tracing::error!(task_id = %id, error = %err, "execute failed");
        }
    });
    Ok(StatusCode::ACCEPTED)
}

async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.cancel(&id) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(task_not_found(&id))
    }
}

async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    // Subscribe before snapshotting so no event can fall in the gap.
    let mut subscription = state.orchestrator.subscribe(&id);
    let task = state
        .orchestrator
        .get_task(&id)
        .await
        .ok_or_else(|| task_not_found(&id))?;
    let snapshot = preview_task(&task, state.orchestrator.preview_max_bytes());
    let snapshot_json =
        serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());

    let event_stream = stream! {
        yield Ok(SseEvent::default().event("snapshot").data(snapshot_json));
        while let Some(event) = subscription.recv().await {
            let name = event.event.as_str();
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok(SseEvent::default().event(name).data(data)),
                Err(err) => {
                    tracing::warn!(task_id = %event.task_id, error = %err, "event serialization failed");
                }
            }
        }
    };

    Ok(Sse::new(event_stream).keep_alive(
        KeepAlive::new()
            .interval(SSE_PING_INTERVAL)
            .text("ping"),
    ))
}

async fn full_result(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(String, String)>,
    Query(query): Query<ResultQuery>,
) -> Result<Response, ApiError> {
    let output = state
        .orchestrator
        .step_output(&id, &step_id)
        .await
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("no result for task {} step {}", id, step_id),
            )
        })?;

    let is_text = output.is_string() || output.is_null();
    let body = render_output(&output);
    let content_type = if is_text {
        "text/plain; charset=utf-8"
    } else {
        "application/json"
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if query.download.as_deref() == Some("1") {
        let extension = if is_text { "txt" } else { "json" };
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}_{}.{}\"", id, step_id, extension),
        );
    }
    builder
        .body(Body::from(body))
        .map_err(|err| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                err.to_string(),
            )
        })
        .map(IntoResponse::into_response)
}
