//! Scripted LLM client for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient};

/// Replies with queued results in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub(crate) requests: Mutex<Vec<(String, Vec<ChatMessage>, Option<f64>)>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep for `delay` before every reply.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// User message of the `index`-th request.
    pub(crate) fn user_message(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].1[1].content.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatResponse> {
        self.chat_completion_with_options(model, messages, ChatOptions::default())
            .await
    }

    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec(), options.temperature));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply left".to_string()));

        match reply {
            Ok(content) => Ok(ChatResponse {
                content: Some(content),
                finish_reason: Some("stop".to_string()),
                usage: None,
                model: Some(model.to_string()),
            }),
            Err(message) => Err(anyhow::anyhow!(message)),
        }
    }
}
