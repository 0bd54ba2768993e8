//! Task record: a submitted description and its four role steps.
//!
//! # Invariants
//! - `steps` holds one entry per role, in pipeline order
//! - A record is only mutated while `Running`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::prompts::step_prompt;
use crate::agents::AgentRole;

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a task in its lifecycle.
///
/// ```text
/// Pending -> Running -> Completed
///                   \-> Failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed { reason: String },
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed { .. })
    }
}

/// One role's step: the prompt sent and the text that came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub role: AgentRole,
    pub prompt: String,
    pub output: Option<String>,
}

/// A submitted task and everything its run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    id: TaskId,
    description: String,
    steps: Vec<StepRecord>,
    status: TaskStatus,
    result: Option<String>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a pending record with the four fixed steps.
    ///
    /// # Errors
    /// Returns `TaskError::EmptyDescription` for blank descriptions.
    pub fn new(description: impl Into<String>) -> Result<Self, TaskError> {
        Self::with_id(TaskId::new(), description)
    }

    fn with_id(id: TaskId, description: impl Into<String>) -> Result<Self, TaskError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(TaskError::EmptyDescription);
        }

        let steps = AgentRole::PIPELINE
            .iter()
            .map(|role| StepRecord {
                role: *role,
                prompt: step_prompt(*role, &description),
                output: None,
            })
            .collect();

        Ok(Self {
            id,
            description,
            steps,
            status: TaskStatus::Pending,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    /// Combined output, set once the run completes.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Outputs of all finished steps, in order.
    pub fn outputs(&self) -> Vec<String> {
        self.steps.iter().filter_map(|s| s.output.clone()).collect()
    }

    pub fn start(&mut self) -> Result<(), TaskError> {
        match &self.status {
            TaskStatus::Pending => {
                self.status = TaskStatus::Running;
                Ok(())
            }
            other => Err(TaskError::InvalidTransition {
                from: format!("{:?}", other),
                to: "Running".to_string(),
            }),
        }
    }

    /// Store the output of step `index`.
    pub fn record_output(&mut self, index: usize, output: String) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::NotRunning);
        }
        let step = self
            .steps
            .get_mut(index)
            .ok_or(TaskError::UnknownStep(index))?;
        step.output = Some(output);
        Ok(())
    }

    pub fn complete(&mut self, result: String) -> Result<(), TaskError> {
        match &self.status {
            TaskStatus::Running => {
                self.status = TaskStatus::Completed;
                self.result = Some(result);
                self.finished_at = Some(Utc::now());
                Ok(())
            }
            other => Err(TaskError::InvalidTransition {
                from: format!("{:?}", other),
                to: "Completed".to_string(),
            }),
        }
    }

    /// Mark the task failed. Allowed from `Pending` too, for runs that never started.
    pub fn fail(&mut self, reason: String) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(TaskError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: "Failed".to_string(),
            });
        }
        self.status = TaskStatus::Failed { reason };
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

/// Errors that can occur during task operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("Task description cannot be empty")]
    EmptyDescription,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Task is not running")]
    NotRunning,

    #[error("No step at index {0}")]
    UnknownStep(usize),
}
