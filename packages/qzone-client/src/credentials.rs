//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate so session cookies never end up in logs, debug
//! output or error messages.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

use crate::error::{QzoneError, Result};

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when actually sending the secret upstream.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Source of the raw browser cookie string for a domain.
///
/// The only sanctioned channel for obtaining or refreshing `uin` / `skey` /
/// `p_skey`. Called once per session derivation.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn cookies(&self, domain: &str) -> Result<String>;
}

/// Cookie string supplied up front (config file, environment).
#[derive(Clone)]
pub struct StaticCookies {
    cookies: SecretString,
}

impl StaticCookies {
    pub fn new(cookies: impl Into<String>) -> Self {
        Self {
            cookies: SecretString::new(cookies),
        }
    }
}

impl fmt::Debug for StaticCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCookies")
            .field("cookies", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialSource for StaticCookies {
    async fn cookies(&self, _domain: &str) -> Result<String> {
        if self.cookies.is_empty() {
            return Err(QzoneError::Credentials("no cookies configured".into()));
        }
        Ok(self.cookies.expose().to_string())
    }
}
