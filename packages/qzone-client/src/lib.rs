//! Qzone Client Library
//!
//! Automates one QQ Zone account over its undocumented web endpoints:
//! publish status posts, like, comment, reply, delete and list feeds.
//!
//! # Design
//!
//! - Session cookies come from an injected [`CredentialSource`]; the `g_tk`
//!   anti-forgery token is derived from them on demand
//! - Every call goes through one executor that recovers from an expired
//!   login by re-deriving the session and resending the request
//! - JSON, JSONP and HTML-embedded responses are normalized into one
//!   [`ApiResult`] and into [`Post`] / [`Comment`] entities
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use qzone_client::{ClientConfig, QzoneApi, StaticCookies};
//!
//! let api = QzoneApi::new(
//!     Arc::new(StaticCookies::new("uin=o12345; skey=@abc; p_skey=xyz")),
//!     ClientConfig::default(),
//! );
//!
//! let posts = api.get_feeds(12345, 0, 5).await?;
//! let result = api.like(&posts[0]).await?;
//! ```
//!
//! # Modules
//!
//! - [`session`] - Session context and token derivation
//! - [`client`] - Resilient request executor
//! - [`parser`] - Response normalization and feed parsers
//! - [`models`] - Post and comment entities
//! - [`api`] - Service façade
//! - [`testing`] - Mock transport and credential source

pub mod api;
pub mod client;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod images;
pub mod models;
pub mod parser;
pub mod session;
pub mod testing;
pub mod transport;

// Re-export core types at crate root
pub use api::QzoneApi;
pub use client::{ApiRequest, QzoneHttpClient};
pub use config::ClientConfig;
pub use credentials::{CredentialSource, SecretString, StaticCookies};
pub use error::{ParseError, QzoneError, Result};
pub use models::{Comment, Post, PostStatus, PublishReceipt};
pub use parser::{
    parse_feed_list, parse_feeds, parse_recent_feeds, parse_response, parse_upload_result,
    parse_visitors, ApiResult, ResultKeys,
};
pub use session::{gtk, Session, SessionContext};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
