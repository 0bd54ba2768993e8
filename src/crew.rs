//! Sequential crew runner.
//!
//! Runs the four role agents in fixed order against one [`TaskRecord`]. Each
//! agent sees the outputs of the agents before it. The first failure aborts
//! the run; there is no retry and no partial result.
//!
//! ```text
//! Architect ─▶ Coder ─▶ Reviewer ─▶ Tester ─▶ outputs joined with "\n\n"
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::agents::{AgentError, AgentRole, RoleAgent};
use crate::config::LlmConfig;
use crate::llm::LlmClient;
use crate::task::{TaskError, TaskRecord};

/// Separator between stage outputs in the combined result.
pub const OUTPUT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum CrewError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Receives stage notifications while the crew runs.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn stage_started(&self, role: AgentRole);

    async fn stage_finished(&self, role: AgentRole, output: &str);

    /// Called whenever `record` changes: on start and after each step.
    async fn record_updated(&self, _record: &TaskRecord) {}
}

/// Sink that only logs.
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn stage_started(&self, role: AgentRole) {
        tracing::info!("🔄 {} is working...", role);
    }

    async fn stage_finished(&self, role: AgentRole, output: &str) {
        tracing::info!("{} finished ({} chars)", role, output.len());
    }
}

/// The four agents, in pipeline order.
pub struct Crew {
    agents: Vec<RoleAgent>,
}

impl Crew {
    pub fn new(llm: Arc<dyn LlmClient>, model: &str, temperature: f64) -> Self {
        let agents = AgentRole::PIPELINE
            .iter()
            .map(|role| RoleAgent::new(*role, Arc::clone(&llm), model.to_string(), temperature))
            .collect();
        Self { agents }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self::new(llm, &config.model, config.temperature)
    }

    /// Execute every step of `record` and return the combined output.
    ///
    /// On error the record is marked failed before the error is returned.
    pub async fn run(
        &self,
        record: &mut TaskRecord,
        progress: &dyn ProgressSink,
    ) -> Result<String, CrewError> {
        record.start()?;
        progress.record_updated(record).await;
        tracing::info!("Crew starting task {}", record.id());

        match self.run_steps(record, progress).await {
            Ok(result) => {
                record.complete(result.clone())?;
                tracing::info!("Crew finished task {}", record.id());
                Ok(result)
            }
            Err(e) => {
                tracing::error!("Crew aborted task {}: {}", record.id(), e);
                record.fail(e.to_string())?;
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        record: &mut TaskRecord,
        progress: &dyn ProgressSink,
    ) -> Result<String, CrewError> {
        let mut outputs: Vec<String> = Vec::with_capacity(self.agents.len());

        for (index, agent) in self.agents.iter().enumerate() {
            let prompt = record.steps()[index].prompt.clone();
            progress.stage_started(agent.role()).await;

            let output = agent.execute(&prompt, &outputs).await?;

            record.record_output(index, output.clone())?;
            progress.record_updated(record).await;
            progress.stage_finished(agent.role(), &output).await;
            outputs.push(output);
        }

        Ok(outputs.join(OUTPUT_SEPARATOR))
    }
}
