//! Configuration management for AutoDev Team.
//!
//! Configuration can be set via environment variables (a `.env` file in the
//! working directory is loaded first, if present):
//! - `OPENAI_API_KEY` - Required. API key for the chat-completion endpoint.
//! - `DEFAULT_MODEL` - Optional. Model used by every agent. Defaults to `gpt-4`.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.7`.
//! - `LLM_API_URL` - Optional. OpenAI-compatible chat completions URL.
//! - `LLM_TIMEOUT_SECS` - Optional. Per-request timeout. Defaults to `600`.
//! - `LLM_MAX_RETRIES` - Optional. Retries for transient LLM failures. Defaults to `0`.
//! - `OUTPUT_DIR` - Optional. Directory for generated files. Defaults to `outputs`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the hosted model endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer token sent with every request
    pub api_key: String,

    /// Chat completions endpoint
    pub api_url: String,

    /// Model identifier shared by all four agents
    pub model: String,

    pub temperature: f64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retry attempts for rate limits, server and network errors
    pub max_retries: u32,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    /// Directory that receives extracted code files and `full_result.txt`
    pub output_dir: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set, and
    /// `ConfigError::InvalidValue` for numeric variables that fail to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let llm = LlmConfig {
            api_key,
            api_url: std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            model: std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            temperature: parse_env("LLM_TEMPERATURE", 0.7)?,
            timeout_secs: parse_env("LLM_TIMEOUT_SECS", 600)?,
            max_retries: parse_env("LLM_MAX_RETRIES", 0)?,
        };

        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("outputs"));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("PORT", 3000)?;

        Ok(Self {
            llm,
            output_dir,
            host,
            port,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, model: String, output_dir: PathBuf) -> Self {
        Self {
            llm: LlmConfig {
                api_key,
                api_url: DEFAULT_API_URL.to_string(),
                model,
                temperature: 0.7,
                timeout_secs: 600,
                max_retries: 0,
            },
            output_dir,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Read `name` from the environment, falling back to `default` when unset.
fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
