//! OpenAI-compatible chat completions client with optional retry for transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::error::{LlmError, RetryConfig};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};
use crate::config::LlmConfig;

/// Chat completions client for OpenAI and API-compatible hosts.
pub struct OpenAiClient {
    client: Client,
    api_url: String,
    api_key: String,
    retry_config: RetryConfig,
}

impl OpenAiClient {
    /// Create a client from the LLM section of the application config.
    pub fn from_config(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            retry_config: RetryConfig::with_max_retries(config.max_retries),
        })
    }

    /// Parse Retry-After header if present.
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network_error(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::network_error(format!("Connection failed: {}", e))
                } else {
                    LlmError::network_error(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &body, retry_after));
        }

        parse_completion(&body, &request.model)
    }

    /// Execute a request, retrying transient failures while the retry config allows.
    async fn execute_with_retry(&self, request: &CompletionRequest) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            let error = match self.execute_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Request succeeded after {} retries (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            if !self.retry_config.should_retry(&error, attempt) {
                tracing::error!("LLM request failed after {} retries: {}", attempt, error);
                return Err(error.into());
            }

            let remaining = self
                .retry_config
                .max_retry_duration
                .saturating_sub(start.elapsed());
            let delay = error.suggested_delay(attempt).min(remaining);
            if delay.is_zero() {
                tracing::warn!("Retry budget exhausted: {}", error);
                return Err(error.into());
            }

            tracing::warn!(
                "Attempt {} failed with {}, retrying in {:?}: {}",
                attempt + 1,
                error.kind,
                delay,
                error.message
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Decode a successful chat completions body.
fn parse_completion(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

    Ok(ChatResponse {
        content: choice.message.content,
        finish_reason: choice.finish_reason,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        model: parsed.model.or_else(|| Some(requested_model.to_string())),
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
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
        let request = CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: options.temperature,
        };

        tracing::debug!("Sending chat completion request: model={}", model);

        self.execute_with_retry(&request).await
    }
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
