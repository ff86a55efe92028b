//! Typed errors for the Qzone client.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can branch
//! on the failure class. Every variant maps onto the upstream `code`
//! convention through [`QzoneError::code`].

use thiserror::Error;

use crate::constants::{
    CODE_LOGIN_EXPIRED, CODE_PERMISSION_DENIED, CODE_PERMISSION_DENIED_LEGACY, CODE_UNKNOWN,
};
use crate::parser::ApiResult;

/// Errors that can occur while talking to Qzone.
#[derive(Debug, Error)]
pub enum QzoneError {
    /// HTTP status outside the accepted set; never retried
    #[error("unexpected HTTP status {status} from {url}")]
    Transport { status: u16, url: String },

    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request timed out
    #[error("timeout requesting: {url}")]
    Timeout { url: String },

    /// Session kept expiring after re-login
    #[error("login expired, gave up after {retries} re-logins")]
    AuthExpired { retries: u32 },

    /// Normalized permission failure
    #[error("{message}")]
    PermissionDenied { message: String },

    /// Body could not be normalized
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Well-formed response carrying a non-success business code
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },

    /// Credential source failed to produce cookies
    #[error("credential source failed: {0}")]
    Credentials(String),

    /// Cookie string lacks a usable account id
    #[error("invalid cookie: {0}")]
    InvalidCookie(String),

    /// Illegal moderation status change
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Errors produced while normalizing a response body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty response body")]
    Empty,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("JSON root is not an object")]
    NonObject,

    #[error("missing field: {0}")]
    MissingField(String),
}

impl QzoneError {
    /// Upstream-style numeric code for this failure.
    pub fn code(&self) -> i64 {
        match self {
            Self::Transport { status, .. } => i64::from(*status),
            Self::AuthExpired { .. } => CODE_LOGIN_EXPIRED,
            Self::PermissionDenied { .. } => CODE_PERMISSION_DENIED,
            Self::Api { code, .. } => *code,
            _ => CODE_UNKNOWN,
        }
    }

    /// Session-derivation failures are the only errors façade calls surface
    /// as `Err`; everything else is folded into a failed [`ApiResult`].
    pub fn is_session_error(&self) -> bool {
        matches!(self, Self::Credentials(_) | Self::InvalidCookie(_))
    }

    /// Convert a failed result into the matching error variant.
    pub fn from_failed(result: &ApiResult) -> Self {
        let message = result
            .message
            .clone()
            .unwrap_or_else(|| result.code.to_string());
        match result.code {
            CODE_PERMISSION_DENIED | CODE_PERMISSION_DENIED_LEGACY => {
                Self::PermissionDenied { message }
            }
            code => Self::Api { code, message },
        }
    }
}

/// Result type alias for Qzone operations.
pub type Result<T> = std::result::Result<T, QzoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(QzoneError::AuthExpired { retries: 2 }.code(), -3000);
        assert_eq!(
            QzoneError::Transport {
                status: 502,
                url: "x".into()
            }
            .code(),
            502
        );
        assert_eq!(QzoneError::Parse(ParseError::NonObject).code(), -1);
        assert_eq!(
            QzoneError::Api {
                code: -10001,
                message: "busy".into()
            }
            .code(),
            -10001
        );
    }

    #[test]
    fn test_session_errors() {
        assert!(QzoneError::InvalidCookie("no uin".into()).is_session_error());
        assert!(QzoneError::Credentials("down".into()).is_session_error());
        assert!(!QzoneError::AuthExpired { retries: 2 }.is_session_error());
    }
}
