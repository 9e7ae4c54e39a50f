//! # Baton Core
//!
//! Core abstractions for the Baton tool runner:
//! - Task / Plan / Step / StepResult data model with its status machine
//! - The `Tool` contract and the name-keyed tool registry
//! - The `{{step:ID.output}}` template resolver for inter-step dataflow
//! - Bounded result previews for the wire
//!
//! This crate does NOT know about:
//! - HTTP surfaces or event transports
//! - Which planner or verifier drives a task
//! - Any concrete tool or LLM provider

pub mod preview;
pub mod registry;
pub mod template;
pub mod tool;
pub mod types;

pub use preview::{preview_result, preview_task, render_output, ResultPreview, TaskPreview};
pub use registry::ToolRegistry;
pub use template::{resolve_inputs, resolve_value, stringify_output};
pub use tool::{CancellationToken, RunContext, TokenCallback, Tool, ToolError, ToolOutput};
pub use types::{Plan, Status, Step, StepResult, Task, TaskSummary};
