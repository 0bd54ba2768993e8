//! Process-wide UI session and the submission runner.
//!
//! There is one session per server: one chat log, one file list and at most
//! one run in progress.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::agents::AgentRole;
use crate::crew::ProgressSink;
use crate::files::GeneratedFile;
use crate::task::{TaskId, TaskRecord};

use super::routes::AppState;
use super::types::{ChatEntry, FileSummary, SessionSnapshot, SessionStatus};

/// Mutable session data shared by all requests.
#[derive(Debug, Default)]
pub struct SessionState {
    pub messages: Vec<ChatEntry>,
    /// Unique by path, in first-written order
    pub generated_files: Vec<FileSummary>,
    pub current_agent: Option<String>,
    pub task_in_progress: bool,
    pub tasks: Vec<TaskRecord>,
    pub runs_finished: u64,
    /// Error of the most recent run, if it failed
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            current_agent: self.current_agent.clone(),
            task_in_progress: self.task_in_progress,
            runs_finished: self.runs_finished,
            last_error: self.last_error.clone(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            files: self.generated_files.clone(),
            status: self.status(),
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Replace the stored copy of `record`.
    pub fn store_task(&mut self, record: TaskRecord) {
        match self.tasks.iter_mut().find(|t| t.id() == record.id()) {
            Some(existing) => *existing = record,
            None => self.tasks.push(record),
        }
    }

    /// Add files to the sidebar; a path already listed keeps its slot.
    pub fn add_files(&mut self, files: &[GeneratedFile]) {
        for file in files {
            let summary = FileSummary::from(file);
            match self
                .generated_files
                .iter_mut()
                .find(|f| f.path == summary.path)
            {
                Some(existing) => *existing = summary,
                None => self.generated_files.push(summary),
            }
        }
    }

    /// Claim the session for a new task.
    ///
    /// Returns `None` if a run is already in progress.
    pub fn begin(&mut self, record: TaskRecord) -> Option<TaskId> {
        if self.task_in_progress {
            return None;
        }
        let id = record.id();
        self.task_in_progress = true;
        self.messages.push(ChatEntry::user(record.description()));
        self.tasks.push(record);
        Some(id)
    }

    fn finish(&mut self, error: Option<String>) {
        self.task_in_progress = false;
        self.current_agent = None;
        self.runs_finished += 1;
        self.last_error = error;
    }
}

/// Progress sink that writes agent output into the chat log.
struct SessionProgress<'a> {
    session: &'a RwLock<SessionState>,
}

#[async_trait]
impl ProgressSink for SessionProgress<'_> {
    async fn stage_started(&self, role: AgentRole) {
        tracing::info!("🔄 {} is working...", role);
        self.session.write().await.current_agent = Some(role.display_name().to_string());
    }

    async fn stage_finished(&self, role: AgentRole, output: &str) {
        self.session
            .write()
            .await
            .messages
            .push(ChatEntry::agent(role.display_name(), output));
    }

    async fn record_updated(&self, record: &TaskRecord) {
        self.session.write().await.store_task(record.clone());
    }
}

/// Run a claimed task to completion (background).
///
/// Any failure ends up as a single chat message; the session is always
/// released afterwards.
pub async fn run_submission(state: Arc<AppState>, id: TaskId) {
    let outcome = execute(&state, id).await;

    let mut session = state.session.write().await;
    match outcome {
        Ok(()) => session.finish(None),
        Err(e) => {
            tracing::error!("Task {} failed: {:#}", id, e);
            session
                .messages
                .push(ChatEntry::assistant(format!("❌ Error: {}", e)));
            session.finish(Some(e.to_string()));
        }
    }
}

async fn execute(state: &AppState, id: TaskId) -> anyhow::Result<()> {
    let mut record = state
        .session
        .read()
        .await
        .task(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Task {} not found", id))?;

    let progress = SessionProgress {
        session: &state.session,
    };
    let outcome = state.crew.run(&mut record, &progress).await;
    state.session.write().await.store_task(record);
    let result = outcome?;

    state
        .session
        .write()
        .await
        .messages
        .push(ChatEntry::assistant(format!(
            "Task completed! Here's the final result:\n\n{}",
            result
        )));

    let files = state.outputs.save_result(&result).await?;
    state.session.write().await.add_files(&files);
    Ok(())
}
