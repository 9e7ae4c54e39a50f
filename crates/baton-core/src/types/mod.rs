//! Data model for the Baton task pipeline.
//!
//! A `Task` owns an optional `Plan`; a `Plan` is an ordered list of `Step`s;
//! executing a `Step` yields a `StepResult`. Tasks and steps share the same
//! `Status` machine.

mod plan;
mod result;
mod step;
mod task;

pub use plan::Plan;
pub use result::StepResult;
pub use step::Step;
pub use task::{Status, Task, TaskSummary};
