//! API request and response types.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::extract::Section;
use crate::files::GeneratedFile;
use crate::task::{TaskId, TaskStatus};

/// Request to submit a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// The task description / user prompt
    pub task: String,
}

/// Response after creating a task.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskResponse {
    pub id: TaskId,
    pub status: TaskStatus,
}

/// Who wrote a chat entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// The person submitting tasks
    User,
    /// One of the four crew agents
    Agent,
    /// Run summaries and errors
    Assistant,
}

/// A single entry in the chat log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,

    /// Agent display name, for `ChatRole::Agent` entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    pub content: String,

    /// Timestamp (RFC 3339)
    pub timestamp: String,
}

impl ChatEntry {
    fn new(role: ChatRole, agent: Option<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            agent,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, None, content)
    }

    pub fn agent(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(ChatRole::Agent, Some(name.into()), content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, None, content)
    }
}

/// Sidebar entry for a generated file (content lives on disk).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSummary {
    pub filename: String,
    pub language: String,
    pub section: Option<Section>,
    pub path: PathBuf,
}

impl From<&GeneratedFile> for FileSummary {
    fn from(file: &GeneratedFile) -> Self {
        Self {
            filename: file.filename.clone(),
            language: file.language.clone(),
            section: file.section,
            path: file.path.clone(),
        }
    }
}

/// A generated file with its current content, or the error reading it.
#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    #[serde(flatten)]
    pub summary: FileSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run status shown next to the chat.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub current_agent: Option<String>,
    pub task_in_progress: bool,
    /// Increments when a run ends, so a run that starts and ends between
    /// two polls still changes the status
    pub runs_finished: u64,
    pub last_error: Option<String>,
}

/// Everything the page needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatEntry>,
    pub files: Vec<FileSummary>,
    #[serde(flatten)]
    pub status: SessionStatus,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Model used by every agent
    pub model: String,
    pub output_dir: String,
}
