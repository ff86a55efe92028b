//! Legacy friend-feed listing, where each entry carries an HTML fragment.
//!
//! Produces the same [`Post`] / [`Comment`] types as the JSON parser, so
//! callers never care which endpoint a post came from.

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, error, info};

use super::feeds::dedup;
use crate::constants::{APPID_SHUOSHUO, EMOJI_ICON_HOST};
use crate::models::{value_i64, value_string, Comment, Post, PostStatus};

static SEL_TEXT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.f-info").unwrap());
static SEL_FORWARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.txt-box").unwrap());
static SEL_IMG_BOX: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.img-box").unwrap());
static SEL_IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static SEL_VIDEO_THUMB: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.video-img img").unwrap());
static SEL_VIDEO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.img-box.f-video-wrap.play").unwrap());
static SEL_COMMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.comments-item.bor3").unwrap());
static SEL_COMMENT_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.comments-content").unwrap());
static SEL_COMMENT_TIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.state").unwrap());

/// Parse the `feeds3_html_more` payload (`data.data` holds the entries).
///
/// Only plain status posts are kept. Entries without owner id, remote id or
/// HTML are skipped with an error log; the rest of the batch still parses.
pub fn parse_recent_feeds(body: &Map<String, Value>) -> Vec<Post> {
    let Some(feeds) = body
        .get("data")
        .and_then(|data| data.get("data"))
        .and_then(Value::as_array)
    else {
        debug!("Recent feed payload has no entries");
        return Vec::new();
    };

    let mut posts = Vec::new();
    for feed in feeds.iter().filter(|feed| !feed.is_null()) {
        if value_string(feed.get("appid")) != APPID_SHUOSHUO {
            continue;
        }

        let uin = value_i64(feed.get("uin"));
        let tid = value_string(feed.get("key"));
        if uin == 0 || tid.is_empty() {
            error!(uin, tid = %tid, "Invalid feed entry");
            continue;
        }

        let html = feed.get("html").and_then(Value::as_str).unwrap_or_default();
        if html.trim().is_empty() {
            error!(uin, tid = %tid, "Feed entry has no content");
            continue;
        }

        let nickname = feed
            .get("nickname")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let create_time = value_i64(feed.get("abstime"));

        posts.push(parse_fragment(html, uin, tid, nickname, create_time));
    }

    info!(count = posts.len(), "Parsed recent feeds");
    posts
}

fn parse_fragment(html: &str, uin: i64, tid: String, name: String, create_time: i64) -> Post {
    let doc = Html::parse_fragment(html);

    let text = doc
        .select(&SEL_TEXT)
        .next()
        .map(stripped_text)
        .unwrap_or_default();

    // "Nickname：quoted words" -> "quoted words"
    let rt_con = doc
        .select(&SEL_FORWARD)
        .next()
        .map(stripped_text)
        .map(|quoted| match quoted.split_once('：') {
            Some((_, rest)) => rest.trim().to_string(),
            None => quoted,
        })
        .unwrap_or_default();

    let mut images: Vec<String> = doc
        .select(&SEL_IMG_BOX)
        .next()
        .map(|img_box| {
            img_box
                .select(&SEL_IMG)
                .filter_map(|img| img.value().attr("src"))
                .filter(|src| !src.is_empty() && !src.starts_with(EMOJI_ICON_HOST))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if let Some(thumb) = doc
        .select(&SEL_VIDEO_THUMB)
        .next()
        .and_then(|img| img.value().attr("src"))
    {
        images.push(thumb.to_string());
    }

    let videos = doc
        .select(&SEL_VIDEO)
        .next()
        .and_then(|video| video.value().attr("url3"))
        .map(|url| vec![url.to_string()])
        .unwrap_or_default();

    let comments = doc.select(&SEL_COMMENT).map(parse_comment).collect();

    Post {
        id: None,
        tid,
        uin,
        name,
        gin: 0,
        text,
        images: dedup(images),
        videos,
        anon: false,
        status: PostStatus::Approved,
        create_time,
        rt_con,
        comments,
        extra_text: None,
    }
}

fn parse_comment(item: ElementRef<'_>) -> Comment {
    let attr = |name: &str| item.value().attr(name).unwrap_or_default().to_string();

    let content = item
        .select(&SEL_COMMENT_CONTENT)
        .next()
        .map(|content| {
            let mut parts = Vec::new();
            collect_text_skipping_ops(content, &mut parts);
            let joined = parts.join(" ");
            // Strip the "Nickname :" prefix
            match joined.split_once(':') {
                Some((_, rest)) => rest.trim().to_string(),
                None => joined,
            }
        })
        .unwrap_or_default();

    let create_time_str = item
        .select(&SEL_COMMENT_TIME)
        .next()
        .map(stripped_text)
        .unwrap_or_default();

    Comment {
        uin: digits(&attr("data-uin")),
        nickname: attr("data-nick"),
        content,
        create_time: 0,
        create_time_str,
        tid: digits(&attr("data-tid")),
        parent_tid: enclosing_comment_tid(item),
        source_name: String::new(),
        source_url: String::new(),
    }
}

/// `data-tid` of the top-level comment a nested reply sits under.
///
/// Replies live inside `div.mod-comments-sub`; the nearest `li.comments-item`
/// above that container is the thread root.
fn enclosing_comment_tid(item: ElementRef<'_>) -> Option<i64> {
    let sub_container = item
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && has_class(el, "mod-comments-sub"))?;

    sub_container
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "li" && has_class(el, "comments-item"))
        .and_then(|root| root.value().attr("data-tid"))
        .and_then(|tid| tid.parse().ok())
}

/// Text nodes under `node`, minus the reply/delete button block.
fn collect_text_skipping_ops(node: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in node.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if !has_class(&el, "comments-op") {
                collect_text_skipping_ops(el, parts);
            }
        } else if let Some(text) = child.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }
}

fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn digits(value: &str) -> i64 {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().unwrap_or(0)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FEED_HTML: &str = r#"
<div class="f-single-content f-wrap">
  <div class="f-info">Morning run done[em]e400343[/em]</div>
  <div class="txt-box"><a class="nickname">Dave</a>：quoted words</div>
  <div class="img-box">
    <img src="https://a1.qpic.cn/p1.jpg">
    <img src="http://qzonestyle.gtimg.cn/qzone/em/e100.gif">
    <img src="https://a1.qpic.cn/p1.jpg">
  </div>
  <div class="img-box f-video-wrap play" url3="https://video/v.mp4">
    <div class="video-img"><img src="https://thumb/v.jpg"></div>
  </div>
</div>
<div class="comments-list"><ul>
  <li class="comments-item bor3" data-uin="2001" data-tid="1" data-nick="Bob">
    <div class="comments-item-bd">
      <div class="comments-content"><a>Bob</a> : great pic
        <div class="comments-op"><span class="ui-mr10 state">10:00</span><a>reply</a></div>
      </div>
    </div>
    <div class="mod-comments-sub"><ul>
      <li class="comments-item bor3" data-uin="3001" data-tid="2" data-nick="Carol">
        <div class="comments-content"><a>Carol</a> reply <a>Bob</a> : thanks
          <div class="comments-op"><span class="state">10:05</span><a>delete</a></div>
        </div>
      </li>
    </ul></div>
  </li>
  <li class="comments-item bor3" data-uin="4001" data-tid="3" data-nick="Erin">
    <div class="comments-content"><a>Erin</a> : me too</div>
  </li>
</ul></div>
"#;

    fn payload(feeds: Vec<Value>) -> Map<String, Value> {
        json!({"code": 0, "data": {"data": feeds}})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn feed(uin: Value, key: &str) -> Value {
        json!({
            "appid": "311",
            "uin": uin,
            "key": key,
            "nickname": "Alice",
            "abstime": 1700000000,
            "html": FEED_HTML
        })
    }

    #[test]
    fn test_parse_recent_feed_fragment() {
        let posts = parse_recent_feeds(&payload(vec![feed(json!(10001), "k1")]));
        assert_eq!(posts.len(), 1);

        let post = &posts[0];
        assert_eq!(post.uin, 10001);
        assert_eq!(post.tid, "k1");
        assert_eq!(post.name, "Alice");
        assert_eq!(post.create_time, 1700000000);
        assert_eq!(post.text, "Morning run done[em]e400343[/em]");
        assert_eq!(post.rt_con, "quoted words");
        assert_eq!(post.images, vec!["https://a1.qpic.cn/p1.jpg", "https://thumb/v.jpg"]);
        assert_eq!(post.videos, vec!["https://video/v.mp4"]);
    }

    #[test]
    fn test_parse_recent_feed_comment_tree() {
        let posts = parse_recent_feeds(&payload(vec![feed(json!("10001"), "k1")]));
        let comments = &posts[0].comments;

        assert_eq!(comments.len(), 3);

        assert_eq!(comments[0].tid, 1);
        assert_eq!(comments[0].uin, 2001);
        assert_eq!(comments[0].nickname, "Bob");
        assert_eq!(comments[0].content, "great pic");
        assert_eq!(comments[0].create_time_str, "10:00");
        assert_eq!(comments[0].parent_tid, None);

        assert_eq!(comments[1].tid, 2);
        assert_eq!(comments[1].content, "thanks");
        assert_eq!(comments[1].create_time_str, "10:05");
        assert_eq!(comments[1].parent_tid, Some(1));

        assert_eq!(comments[2].tid, 3);
        assert_eq!(comments[2].content, "me too");
        assert_eq!(comments[2].parent_tid, None);
    }

    #[test]
    fn test_parse_recent_feeds_filters_and_skips() {
        let mut other_app = feed(json!(10001), "k0");
        other_app["appid"] = json!(202);
        let mut no_html = feed(json!(10004), "k4");
        no_html["html"] = json!("");

        let posts = parse_recent_feeds(&payload(vec![
            other_app,
            feed(json!(10002), ""),
            Value::Null,
            no_html,
            feed(json!(10005), "k5"),
        ]));

        let tids: Vec<_> = posts.iter().map(|p| p.tid.as_str()).collect();
        assert_eq!(tids, vec!["k5"]);
    }

    #[test]
    fn test_parse_recent_feeds_missing_entries() {
        assert!(parse_recent_feeds(&Map::new()).is_empty());
        assert!(parse_recent_feeds(&payload(vec![])).is_empty());
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits("123"), 123);
        assert_eq!(digits("12a"), 0);
        assert_eq!(digits(""), 0);
    }
}
