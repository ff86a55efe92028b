use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{remove_em_tags, value_i64};

/// Field holding nested replies under a top-level comment.
const NESTED_REPLIES_KEY: &str = "list_3";

/// A single comment on a post: either top-level or a nested reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub uin: i64,
    pub nickname: String,
    pub content: String,
    /// Unix seconds, 0 when upstream only gave a display string
    pub create_time: i64,
    /// Display time as sent by upstream ("yesterday 12:00")
    #[serde(default)]
    pub create_time_str: String,
    #[serde(default)]
    pub tid: i64,
    /// `None` for top-level comments
    #[serde(default)]
    pub parent_tid: Option<i64>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub source_url: String,
}

impl Comment {
    /// Build one comment from a raw JSON object, defaulting missing fields.
    pub fn from_raw(raw: &Value, parent_tid: Option<i64>) -> Self {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            uin: value_i64(raw.get("uin")),
            nickname: text("name"),
            content: text("content"),
            create_time: value_i64(raw.get("create_time")),
            create_time_str: text("createTime2"),
            tid: value_i64(raw.get("tid")),
            parent_tid,
            source_name: text("source_name"),
            source_url: text("source_url"),
        }
    }

    /// Flatten a raw `commentlist` into top-level comments, each followed
    /// immediately by its nested replies.
    pub fn build_list(comment_list: &[Value]) -> Vec<Comment> {
        let mut comments = Vec::with_capacity(comment_list.len());
        for main in comment_list {
            let top = Comment::from_raw(main, None);
            let main_tid = top.tid;
            comments.push(top);

            if let Some(replies) = main.get(NESTED_REPLIES_KEY).and_then(Value::as_array) {
                comments.extend(
                    replies
                        .iter()
                        .map(|sub| Comment::from_raw(sub, Some(main_tid))),
                );
            }
        }
        comments
    }

    pub fn is_reply(&self) -> bool {
        self.parent_tid.is_some()
    }

    /// Content with emoji markup removed.
    pub fn plain_content(&self) -> String {
        remove_em_tags(&self.content)
    }

    /// Indented single-line rendering for grouped thread output.
    pub fn pretty(&self, indent: usize) -> String {
        format!(
            "{}{}: {}",
            "  ".repeat(indent),
            self.nickname,
            self.plain_content()
        )
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.is_reply() { "└─↩" } else { "●" };
        write!(
            f,
            "{} {}({}): {}",
            flag,
            self.nickname,
            self.uin,
            self.plain_content()
        )
    }
}
