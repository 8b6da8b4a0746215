use std::env;
use std::str::FromStr;
use std::time::Duration;

/// What to do when a new question is sent while the previous answer is
/// still streaming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendPolicy {
    /// Close the open answer, ignore the rest of its stream and start the
    /// new one
    #[default]
    ClosePrevious,
    /// Refuse the new send until the open answer finishes
    Reject,
}

impl FromStr for SendPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close-previous" | "close_previous" => Ok(SendPolicy::ClosePrevious),
            "reject" => Ok(SendPolicy::Reject),
            other => Err(format!("Unknown send policy: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub stream_timeout: Duration,
    pub max_upload_bytes: u64,
    pub send_policy: SendPolicy,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

impl ClientConfig {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_send_policy(mut self, send_policy: SendPolicy) -> Self {
        self.send_policy = send_policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api_base_url = env::var("RAGCHAT_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let request_timeout_secs = env::var("RAGCHAT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        let max_upload_bytes = env::var("RAGCHAT_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let send_policy = env::var("RAGCHAT_SEND_POLICY")
            .ok()
            .and_then(|v| {
                v.parse::<SendPolicy>()
                    .inspect_err(|e| tracing::warn!("{}, using default", e))
                    .ok()
            })
            .unwrap_or_default();

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(request_timeout_secs),
            stream_timeout: Duration::from_secs(60 * 5),
            max_upload_bytes,
            send_policy,
        }
    }
}
