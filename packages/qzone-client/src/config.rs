use std::time::Duration;

use crate::constants::USER_AGENT;

/// Tunables of the request layer.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Default per-request timeout
    pub timeout: Duration,
    /// Re-logins attempted before giving up with `AuthExpired`
    pub max_auth_retries: u32,
    pub user_agent: String,
    /// Timeout of image uploads, which carry the whole file in the form body
    pub upload_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_auth_retries: 2,
            user_agent: USER_AGENT.to_string(),
            upload_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_auth_retries(mut self, retries: u32) -> Self {
        self.max_auth_retries = retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }
}
