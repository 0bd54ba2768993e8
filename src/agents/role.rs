//! Role agent: one profile, one chat completion per step.

use std::sync::Arc;

use crate::llm::{ChatMessage, ChatOptions, LlmClient};

use super::{AgentProfile, AgentRole};

/// Errors that can occur while an agent executes its step.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{role} failed: {error}")]
    Llm { role: AgentRole, error: anyhow::Error },

    #[error("{0} returned an empty response")]
    EmptyResponse(AgentRole),
}

/// An agent bound to a model.
pub struct RoleAgent {
    profile: AgentProfile,
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: f64,
}

impl RoleAgent {
    pub fn new(role: AgentRole, llm: Arc<dyn LlmClient>, model: String, temperature: f64) -> Self {
        Self {
            profile: role.profile(),
            llm,
            model,
            temperature,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.profile.role
    }

    /// Build the messages for one step.
    ///
    /// Earlier stage outputs are appended as context so that the reviewer and
    /// tester see the code they are asked about.
    pub fn build_messages(&self, prompt: &str, context: &[String]) -> Vec<ChatMessage> {
        let mut user = prompt.trim().to_string();
        if !context.is_empty() {
            user.push_str(
                "\n\nThis is the context you're working with (output of the previous steps):\n",
            );
            user.push_str(&context.join("\n\n"));
        }
        vec![
            ChatMessage::system(self.profile.system_prompt()),
            ChatMessage::user(user),
        ]
    }

    /// Run the step and return the model's text output.
    pub async fn execute(&self, prompt: &str, context: &[String]) -> Result<String, AgentError> {
        let messages = self.build_messages(prompt, context);
        let options = ChatOptions {
            temperature: Some(self.temperature),
            ..ChatOptions::default()
        };

        tracing::info!("{} working (model={})", self.role(), self.model);

        let response = self
            .llm
            .chat_completion_with_options(&self.model, &messages, options)
            .await
            .map_err(|error| AgentError::Llm {
                role: self.role(),
                error,
            })?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "{} used {} tokens ({} prompt, {} completion)",
                self.role(),
                usage.total_tokens,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(AgentError::EmptyResponse(self.role()))
    }
}
