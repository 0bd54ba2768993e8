//! Task module - task records and the per-role step prompts.

mod prompts;
#[allow(clippy::module_inception)]
pub mod task;

pub use prompts::step_prompt;
pub use task::{StepRecord, TaskError, TaskId, TaskRecord, TaskStatus};
