use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Client configuration, read from `FITTING_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend origin (e.g., "http://localhost:8000"). API calls go to `{origin}/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Delay between fitting status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status polls allowed before giving up on a job.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Estimated fitting duration used by the progress simulator, in seconds.
    #[serde(default = "default_estimated_seconds")]
    pub estimated_seconds: u64,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where to persist the session (token, user name, slots). In-memory when unset.
    #[serde(default)]
    pub session_path: Option<PathBuf>,

    /// Retries for transport errors while polling. Zero means errors propagate immediately.
    #[serde(default)]
    pub transient_retries: u32,

    /// Login credentials for the CLI when no session token is stored.
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_max_attempts() -> u32 {
    60
}

fn default_estimated_seconds() -> u64 {
    45
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
            estimated_seconds: default_estimated_seconds(),
            request_timeout_secs: default_request_timeout_secs(),
            session_path: None,
            transient_retries: 0,
            email: None,
            password: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("FITTING_").from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
