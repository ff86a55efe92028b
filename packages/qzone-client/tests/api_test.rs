//! Façade operations against a mock transport.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

use qzone_client::constants::{
    COMMENT_URL, DELETE_URL, DETAIL_URL, EMOTION_URL, LIST_URL, REPLY_URL, UPLOAD_IMAGE_URL,
    VISITOR_URL, ZONE_LIST_URL,
};
use qzone_client::testing::{MockCredentials, MockTransport};
use qzone_client::{
    ClientConfig, Comment, HttpResponse, Post, PostStatus, PublishReceipt, QzoneApi,
};

const COOKIES: &str = "uin=o10001; skey=@skey; p_skey=abc";
const GTK: &str = "193485963";

fn setup() -> (Arc<MockTransport>, QzoneApi) {
    let transport = Arc::new(MockTransport::new());
    let api = QzoneApi::with_transport(
        transport.clone(),
        Arc::new(MockCredentials::new(COOKIES)),
        ClientConfig::default(),
    );
    (transport, api)
}

fn image(bytes: &[u8]) -> String {
    format!("base64://{}", STANDARD.encode(bytes))
}

fn upload_ok(lloc: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        json!({
            "ret": 0,
            "data": {
                "url": format!("https://photo/{lloc}?a=1&bo={lloc}BO"),
                "albumid": "ALB",
                "lloc": lloc,
                "sloc": lloc,
                "type": 1,
                "height": 100,
                "width": 200
            }
        })
        .to_string(),
    )
}

#[tokio::test]
async fn test_publish_second_upload_failure_skips_submission() {
    let (transport, api) = setup();
    transport.push(UPLOAD_IMAGE_URL, upload_ok("L1"));
    transport.push(
        UPLOAD_IMAGE_URL,
        HttpResponse::new(200, r#"{"ret":-100,"msg":"image too large"}"#),
    );

    let post = Post::draft(10001, "me", "two pictures")
        .with_images(vec![image(b"first"), image(b"second")]);
    let result = api.publish(&post).await.unwrap();

    assert!(!result.ok);
    assert_eq!(result.code, -100);
    assert_eq!(result.message.as_deref(), Some("image too large"));
    assert_eq!(transport.request_count(UPLOAD_IMAGE_URL), 2);
    assert_eq!(transport.request_count(EMOTION_URL), 0);
}

#[tokio::test]
async fn test_publish_with_images() {
    let (transport, api) = setup();
    transport.push(UPLOAD_IMAGE_URL, upload_ok("L1"));
    transport.push(UPLOAD_IMAGE_URL, upload_ok("L2"));
    transport.push(
        EMOTION_URL,
        HttpResponse::new(200, r#"{"code":0,"tid":"newtid","now":1700000000}"#),
    );

    let mut post =
        Post::draft(10001, "me", "hello").with_images(vec![image(b"a"), image(b"b")]);
    let result = api.publish(&post).await.unwrap();
    assert!(result.ok);

    let requests = transport.requests();
    let upload = &requests[0];
    assert_eq!(upload.form_value("picfile"), Some(STANDARD.encode(b"a").as_str()));
    assert_eq!(upload.form_value("p_skey"), Some("abc"));

    let submit = requests.iter().find(|r| r.url == EMOTION_URL).unwrap();
    assert_eq!(submit.query_value("g_tk"), Some(GTK));
    assert_eq!(submit.form_value("con"), Some("hello"));
    assert_eq!(submit.form_value("pic_bo"), Some("L1BO,L2BO"));
    assert_eq!(submit.form_value("richtype"), Some("1"));
    assert_eq!(
        submit.form_value("richval"),
        Some(",ALB,L1,L1,1,100,200,,100,200\t,ALB,L2,L2,1,100,200,,100,200")
    );

    let receipt = PublishReceipt::from_result(&result).unwrap();
    post.apply_receipt(&receipt);
    assert_eq!(post.tid, "newtid");
    assert_eq!(post.create_time, 1700000000);
    assert_eq!(post.status, PostStatus::Approved);
}

#[tokio::test]
async fn test_publish_text_only_skips_uploads() {
    let (transport, api) = setup();
    transport.push(EMOTION_URL, HttpResponse::new(200, r#"{"code":0,"tid":"t"}"#));

    let result = api.publish(&Post::draft(10001, "me", "just text")).await.unwrap();

    assert!(result.ok);
    assert_eq!(transport.request_count(UPLOAD_IMAGE_URL), 0);
    let submit = &transport.requests()[0];
    assert_eq!(submit.form_value("pic_bo"), None);
    assert_eq!(submit.form_value("hostuin"), Some("10001"));
}

#[tokio::test]
async fn test_comment_and_reply_forms() {
    let (transport, api) = setup();
    transport.push(COMMENT_URL, HttpResponse::new(200, r#"{"code":0}"#));
    transport.push(REPLY_URL, HttpResponse::new(200, r#"{"code":0}"#));
    let post = Post {
        uin: 20002,
        tid: "t9".into(),
        ..Default::default()
    };
    let comment = Comment {
        uin: 30003,
        tid: 4,
        ..Default::default()
    };

    assert!(api.comment(&post, "nice").await.unwrap().ok);
    assert!(api.reply(&post, &comment, "thanks").await.unwrap().ok);

    // Comment and reply share one endpoint
    let requests = transport.requests();
    let (sent_comment, sent_reply) = (&requests[0], &requests[1]);
    assert_eq!(sent_comment.form_value("topicId"), Some("20002_t9__1"));
    assert_eq!(sent_comment.form_value("content"), Some("nice"));
    assert_eq!(sent_comment.form_value("commentId"), None);
    assert_eq!(sent_reply.form_value("commentId"), Some("4"));
    assert_eq!(sent_reply.form_value("commentUin"), Some("30003"));
    assert!(sent_reply.headers.iter().any(|(k, _)| k == "Sec-Fetch-Mode"));
}

#[tokio::test]
async fn test_delete_uses_own_uin() {
    let (transport, api) = setup();
    transport.push(DELETE_URL, HttpResponse::new(200, r#"{"code":-10001,"message":"not found"}"#));

    let result = api.delete("gone").await.unwrap();

    assert!(!result.ok);
    assert_eq!(result.message.as_deref(), Some("not found"));
    let sent = &transport.requests()[0];
    assert_eq!(sent.form_value("topicId"), Some("10001_gone__1"));
    assert_eq!(sent.form_value("feedsAppid"), Some("311"));
}

#[tokio::test]
async fn test_get_feeds_parses_jsonp() {
    let (transport, api) = setup();
    let body = json!({
        "code": 0,
        "msglist": [
            {"uin": 20002, "tid": "a", "name": "Ann", "content": "a [em]e1[/em]b", "created_time": 1},
            {"uin": 20002, "tid": "b", "name": "Ann", "content": "two", "created_time": 2}
        ]
    });
    transport.push(LIST_URL, HttpResponse::new(200, format!("_preloadCallback({body});")));

    let posts = api.get_feeds(20002, 0, 2).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].tid, "a");
    // Emoticon markup is stripped and nothing else around it
    assert!(posts[0].to_display().contains("\n\na b\n\n"));
    assert!(!posts[0].to_display().contains("[em]"));
    assert_eq!(transport.requests()[0].query_value("callback"), Some("_preloadCallback"));
}

#[tokio::test]
async fn test_get_feeds_empty_msglist() {
    let (transport, api) = setup();
    transport.push(LIST_URL, HttpResponse::new(200, r#"{"code":0,"msglist":undefined}"#));

    assert!(api.get_feeds(20002, 0, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_detail() {
    let (transport, api) = setup();
    transport.push(
        DETAIL_URL,
        HttpResponse::new(
            200,
            r#"_Callback({"code":0,"uin":20002,"tid":"t1","content":"full","commentlist":[{"tid":1,"uin":5,"name":"Z","content":"c"}]});"#,
        ),
    );
    let stub = Post {
        uin: 20002,
        tid: "t1".into(),
        ..Default::default()
    };

    let detail = api.get_detail(&stub).await.unwrap();

    assert_eq!(detail.text, "full");
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(transport.requests()[0].query_value("format"), Some("jsonp"));
}

#[tokio::test]
async fn test_get_recent_feeds_filters_apps() {
    let (transport, api) = setup();
    let body = json!({
        "code": 0,
        "data": {
            "data": [
                {"appid": "311", "uin": 20002, "key": "k1", "nickname": "Ann", "abstime": 5,
                 "html": "<div class=\"f-info\">hello feed</div>"},
                {"appid": "4", "uin": 20002, "key": "k2", "html": "<div>album</div>"}
            ]
        }
    });
    transport.push(ZONE_LIST_URL, HttpResponse::new(200, body.to_string()));

    let posts = api.get_recent_feeds(1).await.unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].tid, "k1");
    assert_eq!(posts[0].name, "Ann");
    assert_eq!(posts[0].text, "hello feed");
}

#[tokio::test]
async fn test_visitor_summary() {
    let (transport, api) = setup();
    transport.push(
        VISITOR_URL,
        HttpResponse::new(
            200,
            r#"_Callback({"code":0,"data":{"todaycount":1,"totalcount":9,"items":[{"time":1700000000,"name":"Vee","src":0}]}});"#,
        ),
    );

    let summary = api.visitor_summary().await.unwrap();

    assert!(summary.contains("Vee"));
    assert!(summary.contains("last 30 days: 9 visitors"));
}
