use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LmStudioConfig {
    /// Base URL without the `/v1` suffix
    pub base_url: String,
    /// Default model; `None` picks the first model the backend lists
    pub model: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl LmStudioConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set model; empty strings mean "no default"
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = if model.trim().is_empty() { None } else { Some(model) };
        self
    }

    /// Set timeout; zero falls back to the default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL with the trailing slash removed; empty falls back to the default
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl Default for LmStudioConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}
