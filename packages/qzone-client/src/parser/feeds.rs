//! JSON feed entries (`msglist`, detail payloads) into [`Post`]s.

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::error::ParseError;
use crate::models::{value_i64, value_string, Comment, Post, PostStatus};

/// Per-picture URL fields, best quality first.
const IMAGE_URL_KEYS: &[&str] = &["url2", "url3", "url1", "smallurl"];

/// Parse the `msglist` value of a feed listing.
///
/// Anything but an array is logged and yields no posts.
pub fn parse_feed_list(msglist: &Value) -> Vec<Post> {
    match msglist {
        Value::Array(entries) => parse_feeds(entries),
        Value::Null => Vec::new(),
        other => {
            error!(value = %other, "Feed list is not an array");
            Vec::new()
        }
    }
}

/// Parse raw feed entries into posts.
///
/// Entries without an owner id or remote id are skipped with a warning; the
/// rest of the batch still completes.
pub fn parse_feeds(entries: &[Value]) -> Vec<Post> {
    let mut posts = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let Some(msg) = entry.as_object() else {
            warn!(index, "Skipping feed entry that is not an object");
            continue;
        };

        let uin = value_i64(msg.get("uin"));
        let tid = value_string(msg.get("tid"));
        if uin == 0 || tid.is_empty() {
            warn!(index, uin, tid = %tid, "Skipping feed entry without owner or tid");
            continue;
        }

        debug!(uin, tid = %tid, "Parsing feed entry");
        posts.push(build_post(msg, uin, tid));
    }

    posts
}

fn build_post(msg: &Map<String, Value>, uin: i64, tid: String) -> Post {
    let str_field = |key: &str| msg.get(key).and_then(Value::as_str).unwrap_or_default();

    let mut images: Vec<String> = array(msg.get("pic"))
        .iter()
        .filter_map(|pic| {
            IMAGE_URL_KEYS
                .iter()
                .find_map(|key| pic.get(*key).and_then(Value::as_str))
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
        .collect();

    let videos = array(msg.get("video"));
    // Thumbnails are displayed like any other picture
    images.extend(videos.iter().filter_map(|video| {
        ["url1", "pic_url"]
            .iter()
            .find_map(|key| video.get(*key).and_then(Value::as_str).filter(|u| !u.is_empty()))
            .map(str::to_string)
    }));

    let video_urls = videos
        .iter()
        .filter_map(|video| video.get("url3").and_then(Value::as_str))
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    let rt_con = msg
        .get("rt_con")
        .and_then(|rt| rt.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Post {
        id: None,
        tid,
        uin,
        name: str_field("name").to_string(),
        gin: 0,
        text: str_field("content").trim().to_string(),
        images: dedup(images),
        videos: video_urls,
        anon: false,
        status: PostStatus::Approved,
        create_time: value_i64(msg.get("created_time")),
        rt_con,
        comments: Comment::build_list(array(msg.get("commentlist"))),
        extra_text: msg
            .get("source_name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

fn array(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Drop repeated URLs, keeping first occurrence order.
pub(crate) fn dedup(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Extract `(pic_bo, richval)` from an image upload response.
///
/// `pic_bo` is the part of the uploaded URL after `&bo=`; `richval` is the
/// comma-joined descriptor the publish endpoint expects.
pub fn parse_upload_result(payload: &Map<String, Value>) -> Result<(String, String), ParseError> {
    let data = payload
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| ParseError::MissingField("data".into()))?;

    let url = data
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingField("data.url".into()))?;
    let pic_bo = url
        .split_once("&bo=")
        .map(|(_, bo)| bo.to_string())
        .ok_or_else(|| ParseError::MissingField("bo in data.url".into()))?;

    let field = |key: &str| -> Result<String, ParseError> {
        data.get(key)
            .map(|v| value_string(Some(v)))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ParseError::MissingField(format!("data.{key}")))
    };
    let (albumid, lloc, sloc, kind) = (field("albumid")?, field("lloc")?, field("sloc")?, field("type")?);
    let (height, width) = (field("height")?, field("width")?);

    let richval = format!(",{albumid},{lloc},{sloc},{kind},{height},{width},,{height},{width}");
    Ok((pic_bo, richval))
}
