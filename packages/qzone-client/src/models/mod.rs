//! Domain entities shared by both feed parsers.
//!
//! - [`Post`] - a single status update and its comment thread
//! - [`Comment`] - a top-level comment or a nested reply
//! - [`PostStatus`] - moderation lifecycle of a submitted post

mod comment;
mod post;

pub use comment::Comment;
pub use post::{Post, PostStatus, PublishReceipt};

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static RE_EM_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[em\].*?\[/em\]").unwrap());
static RE_MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// Remove inline `[em]...[/em]` emoji markup.
pub fn remove_em_tags(text: &str) -> String {
    RE_EM_TAG.replace_all(text, "").into_owned()
}

/// Replace `{uin:123,nick:Alice,who:1}` mention markup with `Alice `.
///
/// Blocks without a `nick` key are dropped.
pub fn replace_mentions(text: &str) -> String {
    RE_MENTION
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let inner = &caps[0][1..caps[0].len() - 1];
            inner
                .split(',')
                .filter_map(|pair| pair.split_once(':'))
                .find(|(key, _)| key.trim() == "nick")
                .map(|(_, value)| value.trim())
                .filter(|nick| !nick.is_empty())
                .map(|nick| format!("{nick} "))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Read an integer that upstream may send as a number or a numeric string.
pub(crate) fn value_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Read an identifier that upstream may send as a string or a number.
pub(crate) fn value_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| format!("{}", f as i64))
            })
            .unwrap_or_else(|| n.to_string()),
        _ => String::new(),
    }
}
