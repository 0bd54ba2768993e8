//! LLM error types with retry classification.
//!
//! Distinguishes between transient errors (may retry) and permanent errors.

use std::time::Duration;

/// Error from LLM API calls.
#[derive(Debug)]
pub struct LlmError {
    pub kind: LlmErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    pub message: String,
    /// Suggested retry delay (from the Retry-After header)
    pub retry_after: Option<Duration>,
}

impl LlmError {
    /// Create a rate limit error.
    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            kind: LlmErrorKind::RateLimited,
            status_code: Some(429),
            message,
            retry_after,
        }
    }

    /// Create a server error.
    pub fn server_error(status_code: u16, message: String) -> Self {
        Self {
            kind: LlmErrorKind::ServerError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// Create a client error (bad request, auth, etc.).
    pub fn client_error(status_code: u16, message: String) -> Self {
        Self {
            kind: LlmErrorKind::ClientError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// Create a network error.
    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Create a parse error.
    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Build an error from a non-success HTTP status and response body.
    pub fn from_status(status_code: u16, body: &str, retry_after: Option<Duration>) -> Self {
        match classify_http_status(status_code) {
            LlmErrorKind::RateLimited => Self::rate_limited(body.to_string(), retry_after),
            LlmErrorKind::ClientError => Self::client_error(status_code, body.to_string()),
            _ => Self::server_error(status_code, body.to_string()),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Get the suggested delay before retry.
    ///
    /// Returns `retry_after` if set, otherwise exponential backoff from a
    /// per-kind base, capped at 60 seconds.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }

        let base_secs: u64 = match self.kind {
            LlmErrorKind::RateLimited => 5,
            LlmErrorKind::ServerError => 2,
            _ => 1,
        };

        let delay_secs = base_secs.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_secs(delay_secs.min(60))
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Rate limited (429)
    RateLimited,
    /// Server error (5xx)
    ServerError,
    /// Client error (400, 401, 403, 404)
    ClientError,
    /// Connection failed or timed out
    NetworkError,
    /// Response body could not be understood
    ParseError,
}

impl LlmErrorKind {
    /// Check if this error kind is transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited | LlmErrorKind::ServerError | LlmErrorKind::NetworkError
        )
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::RateLimited => write!(f, "Rate limited"),
            LlmErrorKind::ServerError => write!(f, "Server error"),
            LlmErrorKind::ClientError => write!(f, "Client error"),
            LlmErrorKind::NetworkError => write!(f, "Network error"),
            LlmErrorKind::ParseError => write!(f, "Parse error"),
        }
    }
}

/// Configuration for retry behavior.
///
/// The default performs a single attempt; retries are opt-in through
/// `LLM_MAX_RETRIES`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Maximum total time to spend retrying
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            max_retry_duration: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Check if the given error should be retried after `attempt` retries.
    pub fn should_retry(&self, error: &LlmError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_retries
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmErrorKind::RateLimited.is_transient());
        assert!(LlmErrorKind::ServerError.is_transient());
        assert!(LlmErrorKind::NetworkError.is_transient());
        assert!(!LlmErrorKind::ClientError.is_transient());
        assert!(!LlmErrorKind::ParseError.is_transient());
    }

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(429), LlmErrorKind::RateLimited);
        assert_eq!(classify_http_status(500), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(503), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(400), LlmErrorKind::ClientError);
        assert_eq!(classify_http_status(401), LlmErrorKind::ClientError);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let error = LlmError::rate_limited("test".to_string(), None);
        assert!(error.suggested_delay(1) > error.suggested_delay(0));
        assert!(error.suggested_delay(2) > error.suggested_delay(1));
        assert_eq!(error.suggested_delay(10), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_respected() {
        let error = LlmError::rate_limited("test".to_string(), Some(Duration::from_secs(30)));
        assert_eq!(error.suggested_delay(0), Duration::from_secs(30));
        assert_eq!(error.suggested_delay(5), Duration::from_secs(30));
    }

    #[test]
    fn default_config_never_retries() {
        let config = RetryConfig::default();
        let error = LlmError::server_error(502, "bad gateway".to_string());
        assert!(!config.should_retry(&error, 0));

        let config = RetryConfig::with_max_retries(2);
        assert!(config.should_retry(&error, 1));
        assert!(!config.should_retry(&error, 2));
        assert!(!config.should_retry(&LlmError::client_error(401, String::new()), 0));
    }
}
