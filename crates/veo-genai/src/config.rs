//! Client configuration.

use std::time::Duration;

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Per-request timeout for API calls
    pub request_timeout: Duration,
    /// Connection setup limit, shared by API calls and downloads
    pub connect_timeout: Duration,
    /// Longest a download may wait for the next bytes
    pub download_idle_timeout: Duration,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
            download_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl GenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("VEO_API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            request_timeout: std::env::var("VEO_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            connect_timeout: defaults.connect_timeout,
            download_idle_timeout: std::env::var("VEO_DOWNLOAD_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_idle_timeout),
        }
    }

    /// Point at a different API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}
