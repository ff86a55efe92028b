use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{remove_em_tags, replace_mentions, Comment};
use crate::error::{QzoneError, Result};
use crate::parser::ApiResult;

/// Moderation lifecycle of a submitted post.
///
/// Only `Pending -> Approved` and `Pending -> Rejected` are legal; both
/// targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
}

impl PostStatus {
    pub fn can_transition_to(self, next: PostStatus) -> bool {
        matches!(
            (self, next),
            (PostStatus::Pending, PostStatus::Approved) | (PostStatus::Pending, PostStatus::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Approved => "approved",
            PostStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status update, either scraped from a feed or drafted for publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Local persistence id
    pub id: Option<i64>,
    /// Remote id assigned by Qzone, empty until published
    #[serde(default)]
    pub tid: String,
    /// Author account id
    pub uin: i64,
    /// Author nickname
    #[serde(default)]
    pub name: String,
    /// Group the submission came from
    #[serde(default)]
    pub gin: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub anon: bool,
    #[serde(default)]
    pub status: PostStatus,
    /// Unix seconds
    pub create_time: i64,
    /// Forwarded / quoted text
    #[serde(default)]
    pub rt_con: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Free-text annotation (client name for scraped posts)
    #[serde(default)]
    pub extra_text: Option<String>,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: None,
            tid: String::new(),
            uin: 0,
            name: String::new(),
            gin: 0,
            text: String::new(),
            images: Vec::new(),
            videos: Vec::new(),
            anon: false,
            status: PostStatus::Approved,
            create_time: Utc::now().timestamp(),
            rt_con: String::new(),
            comments: Vec::new(),
            extra_text: None,
        }
    }
}

impl Post {
    /// A pending submission awaiting review.
    pub fn draft(uin: i64, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uin,
            name: name.into(),
            text: text.into(),
            status: PostStatus::Pending,
            ..Default::default()
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_group(mut self, gin: i64) -> Self {
        self.gin = gin;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anon = true;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == PostStatus::Pending
    }

    pub fn is_published(&self) -> bool {
        !self.tid.is_empty()
    }

    /// Move to `next`, rejecting anything but `Pending -> Approved|Rejected`.
    pub fn set_status(&mut self, next: PostStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(QzoneError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn approve(&mut self) -> Result<()> {
        self.set_status(PostStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<()> {
        self.set_status(PostStatus::Rejected)
    }

    /// Back-fill remote id and server timestamp after a successful publish.
    pub fn apply_receipt(&mut self, receipt: &PublishReceipt) {
        self.tid = receipt.tid.clone();
        if let Some(now) = receipt.created_at {
            self.create_time = now;
        }
        if self.is_pending() {
            self.status = PostStatus::Approved;
        }
    }

    /// Human-readable rendering with emoji markup stripped.
    pub fn to_display(&self) -> String {
        let verb = if self.is_pending() { "submitted" } else { "posted" };
        let id = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut lines = vec![format!(
            "### [{}] {} {} at {}",
            id,
            self.name,
            verb,
            format_timestamp(self.create_time)
        )];

        if !self.text.is_empty() {
            lines.push(format!("\n\n{}\n\n", remove_em_tags(&self.text)));
        }
        if !self.rt_con.is_empty() {
            lines.push(format!("\n\n[Forwarded]: {}\n\n", remove_em_tags(&self.rt_con)));
        }
        if !self.images.is_empty() {
            lines.push(
                self.images
                    .iter()
                    .map(|img| format!("  ![image]({img})"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        if !self.videos.is_empty() {
            lines.push(
                self.videos
                    .iter()
                    .map(|vid| format!("  [video]({vid})"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        if !self.comments.is_empty() {
            lines.push("\n\n[Comments]\n".to_string());
            for comment in &self.comments {
                lines.push(format!(
                    "- **{}**: {}",
                    remove_em_tags(&comment.nickname),
                    remove_em_tags(&replace_mentions(&comment.content))
                ));
            }
        }
        if self.is_pending() {
            if self.anon {
                lines.push(format!(
                    "\n\nNote: post #{} awaits review, submitted anonymously",
                    id
                ));
            } else {
                lines.push(format!(
                    "\n\nNote: post #{} awaits review, submitted by {}({})",
                    id, self.name, self.uin
                ));
            }
        }
        lines.join("\n")
    }
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Remote id and server timestamp returned by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub tid: String,
    pub created_at: Option<i64>,
}

impl PublishReceipt {
    /// Extract the receipt from a publish result; `None` when the call failed
    /// or upstream returned no `tid`.
    pub fn from_result(result: &ApiResult) -> Option<Self> {
        if !result.ok {
            return None;
        }
        let tid = super::value_string(result.data.get("tid"));
        if tid.is_empty() {
            return None;
        }
        let created_at = Some(super::value_i64(result.data.get("now"))).filter(|ts| *ts > 0);
        Some(Self { tid, created_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_transitions() {
        let mut post = Post::draft(1, "a", "hello");
        assert!(post.is_pending());
        post.approve().unwrap();
        assert_eq!(post.status, PostStatus::Approved);

        // Terminal: no way back, no cross-over
        assert!(post.reject().is_err());
        assert!(post.set_status(PostStatus::Pending).is_err());

        let mut rejected = Post::draft(1, "a", "hello");
        rejected.reject().unwrap();
        let err = rejected.approve().unwrap_err();
        assert!(matches!(err, QzoneError::InvalidTransition { .. }));
    }

    #[test]
    fn test_display_strips_emoji_only() {
        let post = Post {
            name: "Alice".into(),
            text: "sunny day[em]e113[/em] at the lake".into(),
            ..Default::default()
        };

        let display = post.to_display();

        assert!(display.contains("sunny day at the lake"));
        assert!(!display.contains("[em]"));
    }

    #[test]
    fn test_display_pending_annotation() {
        let post = Post::draft(42, "Bob", "hi");
        assert!(post.to_display().contains("submitted by Bob(42)"));

        let anon = Post::draft(42, "Bob", "hi").anonymous();
        let display = anon.to_display();
        assert!(display.contains("submitted anonymously"));
        assert!(!display.contains("Bob(42)"));
    }

    #[test]
    fn test_display_comments_and_media() {
        let mut post = Post {
            name: "Carol".into(),
            rt_con: "quoted".into(),
            images: vec!["https://img/1.jpg".into()],
            videos: vec!["https://vid/1.mp4".into()],
            ..Default::default()
        };
        post.comments.push(Comment::from_raw(
            &json!({"name": "Dan", "content": "@{uin:1,nick:Eve,who:1} look"}),
            None,
        ));

        let display = post.to_display();
        assert!(display.contains("[Forwarded]: quoted"));
        assert!(display.contains("![image](https://img/1.jpg)"));
        assert!(display.contains("[video](https://vid/1.mp4)"));
        assert!(display.contains("- **Dan**: @Eve  look"));
    }

    #[test]
    fn test_apply_receipt() {
        let result = ApiResult::from_raw(
            json!({"code": 0, "tid": "abc123", "now": 1700000000})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let receipt = PublishReceipt::from_result(&result).unwrap();
        assert_eq!(receipt.tid, "abc123");
        assert_eq!(receipt.created_at, Some(1700000000));

        let mut post = Post::draft(1, "a", "b");
        post.apply_receipt(&receipt);
        assert!(post.is_published());
        assert_eq!(post.create_time, 1700000000);
        assert_eq!(post.status, PostStatus::Approved);
    }

    #[test]
    fn test_serde_status_lowercase() {
        let post = Post::draft(1, "a", "b");
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["status"], "pending");
    }
}
