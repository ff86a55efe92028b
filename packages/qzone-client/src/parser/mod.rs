//! Response normalization and entity extraction.
//!
//! - [`parse_response`] - JSON / JSONP / loose JSON into one object
//! - [`ApiResult`] - canonical `ok` / `code` / `message` / `data` outcome
//! - [`parse_feeds`] - JSON feed entries into posts
//! - [`parse_recent_feeds`] - HTML-embedded feed entries into posts
//! - [`parse_visitors`] - visitor summary text
//!
//! Everything here is pure: no network, no session.

mod feeds;
mod html;
mod response;
mod visitors;

pub use feeds::{parse_feed_list, parse_feeds, parse_upload_result};
pub use html::parse_recent_feeds;
pub use response::{parse_response, ApiResult, ResultKeys};
pub(crate) use response::code_value;
pub use visitors::parse_visitors;
