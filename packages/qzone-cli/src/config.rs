use anyhow::{Context, Result};
use dotenvy::dotenv;
use qzone_client::{ClientConfig, SecretString};
use std::env;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Raw browser cookie string for user.qzone.qq.com
    pub cookies: SecretString,
    pub timeout_secs: u64,
    pub max_auth_retries: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            cookies: env::var("QZONE_COOKIES")
                .context("QZONE_COOKIES must be set")?
                .into(),
            timeout_secs: env::var("QZONE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("QZONE_TIMEOUT_SECS must be a valid number")?,
            max_auth_retries: env::var("QZONE_MAX_AUTH_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("QZONE_MAX_AUTH_RETRIES must be a valid number")?,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_auth_retries(self.max_auth_retries)
    }
}
