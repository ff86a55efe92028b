//! Service façade: one method per Qzone operation.
//!
//! Action calls (`publish`, `like`, `comment`, `reply`, `delete`,
//! `get_visitor`) always resolve to an [`ApiResult`]; only a failure to
//! derive the session surfaces as `Err`. Listing calls return domain objects
//! or the error describing why there are none.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{ApiRequest, QzoneHttpClient};
use crate::config::ClientConfig;
use crate::constants::{
    APPID_SHUOSHUO, BASE_URL, COMMENT_URL, DELETE_URL, DETAIL_URL, DOLIKE_URL, EMOTION_URL,
    LIST_URL, REPLY_URL, UPLOAD_IMAGE_URL, USER_AGENT, VISITOR_URL, ZONE_LIST_URL,
};
use crate::credentials::CredentialSource;
use crate::error::{ParseError, QzoneError, Result};
use crate::images::{encode, normalize_images};
use crate::models::{Comment, Post};
use crate::parser::{
    parse_feed_list, parse_feeds, parse_recent_feeds, parse_upload_result, parse_visitors,
    ApiResult, ResultKeys,
};
use crate::session::Session;
use crate::transport::{ReqwestTransport, Transport};

/// Qzone HTTP API bound to one account.
///
/// Cheap to share behind an `Arc`; independent calls may run concurrently.
pub struct QzoneApi {
    client: QzoneHttpClient,
}

impl QzoneApi {
    /// Client over the default reqwest transport.
    pub fn new(credentials: Arc<dyn CredentialSource>, config: ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.timeout));
        Self::with_transport(transport, credentials, config)
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialSource>,
        config: ClientConfig,
    ) -> Self {
        let session = Arc::new(Session::new(credentials));
        Self {
            client: QzoneHttpClient::new(transport, session, config),
        }
    }

    /// Account id of the logged-in session.
    pub async fn uin(&self) -> Result<i64> {
        self.client.session().uin().await
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Publish a status post, uploading its images first.
    ///
    /// Uploads are sequential; the first failed upload is returned as-is and
    /// the post itself is not submitted. A successful result carries `tid`
    /// and `now` (see `PublishReceipt::from_result`).
    pub async fn publish(&self, post: &Post) -> Result<ApiResult> {
        fold(self.try_publish(post).await)
    }

    async fn try_publish(&self, post: &Post) -> Result<ApiResult> {
        let mut pic_bos = Vec::new();
        let mut richvals = Vec::new();

        if !post.images.is_empty() {
            debug!(count = post.images.len(), "Uploading images");
            let images = normalize_images(&self.client, &post.images).await;

            for (index, image) in images.iter().enumerate() {
                let upload = self.upload_image(image).await?;
                if !upload.ok {
                    warn!(index, code = upload.code, "Image upload failed, post not submitted");
                    return Ok(upload);
                }
                let (pic_bo, richval) = parse_upload_result(&upload.data)?;
                pic_bos.push(pic_bo);
                richvals.push(richval);
            }
        }

        let result = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                let mut request = ApiRequest::post(EMOTION_URL)
                    .query("g_tk", ctx.token())
                    .query("uin", ctx.uin)
                    .form("syn_tweet_verson", 1)
                    .form("paramstr", 1)
                    .form("who", 1)
                    .form("con", &post.text)
                    .form("feedversion", 1)
                    .form("ver", 1)
                    .form("ugc_right", 1)
                    .form("to_sign", 0)
                    .form("hostuin", ctx.uin)
                    .form("code_version", 1)
                    .form("format", "json")
                    .form("qzreferrer", format!("{BASE_URL}/{}", ctx.uin));
                if !pic_bos.is_empty() {
                    request = request
                        .form("pic_bo", pic_bos.join(","))
                        .form("richtype", 1)
                        .form("richval", richvals.join("\t"));
                }
                request
            })
            .await?;

        if result.ok {
            info!(tid = ?result.get("tid"), images = pic_bos.len(), "Post published");
        }
        Ok(result)
    }

    async fn upload_image(&self, image: &[u8]) -> Result<ApiResult> {
        let picfile = encode(image);
        let timeout = self.client.config().upload_timeout;

        self.client
            .execute_result(ResultKeys::upload(), |ctx| {
                ApiRequest::post(UPLOAD_IMAGE_URL)
                    .form("filename", "filename")
                    .form("uploadtype", 1)
                    .form("albumtype", 7)
                    .form("skey", ctx.skey())
                    .form("uin", ctx.uin)
                    .form("p_skey", ctx.p_skey())
                    .form("output_type", "json")
                    .form("base64", 1)
                    .form("picfile", &picfile)
                    .headers([
                        ("referer", format!("{BASE_URL}/{}", ctx.uin)),
                        ("origin", BASE_URL.to_string()),
                    ])
                    .timeout(timeout)
            })
            .await
    }

    /// Like a post.
    pub async fn like(&self, post: &Post) -> Result<ApiResult> {
        let key = format!("{BASE_URL}/{}/mood/{}", post.uin, post.tid);
        let outcome = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                ApiRequest::post(DOLIKE_URL)
                    .query("g_tk", ctx.token())
                    .form("qzreferrer", format!("{BASE_URL}/{}", ctx.uin))
                    .form("opuin", ctx.uin)
                    .form("unikey", &key)
                    .form("curkey", &key)
                    .form("appid", APPID_SHUOSHUO)
                    .form("from", 1)
                    .form("typeid", 0)
                    .form("abstime", Utc::now().timestamp())
                    .form("fid", &post.tid)
                    .form("active", 0)
                    .form("format", "json")
                    .form("fupdate", 1)
            })
            .await;
        fold(outcome)
    }

    /// Comment on a post.
    pub async fn comment(&self, post: &Post, content: &str) -> Result<ApiResult> {
        let outcome = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                comment_request(COMMENT_URL, ctx.token(), ctx.uin, post, content)
            })
            .await;
        fold(outcome)
    }

    /// Reply to a comment under a post.
    pub async fn reply(&self, post: &Post, comment: &Comment, content: &str) -> Result<ApiResult> {
        let outcome = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                comment_request(REPLY_URL, ctx.token(), ctx.uin, post, content)
                    .form("commentId", comment.tid)
                    .form("commentUin", comment.uin)
                    .form("richval", "")
                    .form("richtype", "")
                    .form("private", 0)
                    .form("paramstr", 2)
                    .form("qzreferrer", format!("{BASE_URL}/{}/main", ctx.uin))
                    .headers([
                        ("Sec-Fetch-Dest", "empty"),
                        ("Sec-Fetch-Mode", "cors"),
                        ("Sec-Fetch-Site", "same-site"),
                        ("User-Agent", USER_AGENT),
                        ("Referer", "https://user.qzone.qq.com/"),
                        ("Origin", BASE_URL),
                    ])
            })
            .await;
        fold(outcome)
    }

    /// Delete one of the account's own posts.
    pub async fn delete(&self, tid: &str) -> Result<ApiResult> {
        let outcome = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                let uin = ctx.uin;
                ApiRequest::post(DELETE_URL)
                    .query("g_tk", ctx.token())
                    .form("uin", uin)
                    .form("topicId", format!("{uin}_{tid}__1"))
                    .form("feedsType", 0)
                    .form("feedsFlag", 0)
                    .form("feedsKey", tid)
                    .form("feedsAppid", APPID_SHUOSHUO)
                    .form("feedsTime", Utc::now().timestamp())
                    .form("fupdate", 1)
                    .form("ref", "feeds")
                    .form(
                        "qzreferrer",
                        format!(
                            "{BASE_URL}/proxy/domain/ic2.qzone.qq.com/cgi-bin/feeds/feeds_html_module\
                             ?g_iframeUser=1&i_uin={uin}&i_login_uin={uin}&mode=4&previewV8=1\
                             &style=35&version=8&needDelOpr=true"
                        ),
                    )
            })
            .await;
        fold(outcome)
    }

    /// Recent visitors of the account's space.
    pub async fn get_visitor(&self) -> Result<ApiResult> {
        let outcome = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                ApiRequest::get(VISITOR_URL)
                    .query("uin", ctx.uin)
                    .query("mask", 7)
                    .query("g_tk", ctx.token())
                    .query("page", 1)
                    .query("fupdate", 1)
                    .query("clear", 1)
            })
            .await;
        fold(outcome)
    }

    /// Visitor list rendered as a markdown table.
    pub async fn visitor_summary(&self) -> Result<String> {
        let result = self.get_visitor().await?;
        let data = result.into_data()?;
        Ok(parse_visitors(&data))
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Posts of `target_uin`, newest first, starting at `pos`.
    pub async fn get_feeds(&self, target_uin: i64, pos: u32, num: u32) -> Result<Vec<Post>> {
        let data = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                ApiRequest::get(LIST_URL)
                    .query("g_tk", ctx.token())
                    .query("uin", target_uin)
                    .query("ftype", 0)
                    .query("sort", 0)
                    .query("pos", pos)
                    .query("num", num)
                    .query("replynum", 100)
                    .query("callback", "_preloadCallback")
                    .query("code_version", 1)
                    .query("format", "json")
                    .query("need_comment", 1)
                    .query("need_private_comment", 1)
            })
            .await?
            .into_data()?;

        let posts = parse_feed_list(data.get("msglist").unwrap_or(&Value::Null));
        debug!(target_uin, count = posts.len(), "Fetched feeds");
        Ok(posts)
    }

    /// Full version of a post: all comments, images and videos.
    pub async fn get_detail(&self, post: &Post) -> Result<Post> {
        let data = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                ApiRequest::get(DETAIL_URL)
                    .query("uin", post.uin)
                    .query("tid", &post.tid)
                    .query("format", "jsonp")
                    .query("g_tk", ctx.token())
            })
            .await?
            .into_data()?;

        parse_feeds(&[Value::Object(data)])
            .into_iter()
            .next()
            .ok_or_else(|| QzoneError::Parse(ParseError::MissingField("uin/tid in detail".into())))
    }

    /// Friends' feed as rendered on the web home page.
    pub async fn get_recent_feeds(&self, page: u32) -> Result<Vec<Post>> {
        let data = self
            .client
            .execute_result(ResultKeys::default(), |ctx| {
                ApiRequest::get(ZONE_LIST_URL)
                    .query("uin", ctx.uin)
                    .query("scope", 0)
                    .query("view", 1)
                    .query("filter", "all")
                    .query("flag", 1)
                    .query("applist", "all")
                    .query("pagenum", page)
                    .query("aisortEndTime", 0)
                    .query("aisortOffset", 0)
                    .query("aisortBeginTime", 0)
                    .query("begintime", 0)
                    .query("format", "json")
                    .query("g_tk", ctx.token())
                    .query("useutf8", 1)
                    .query("outputhtmlfeed", 1)
            })
            .await?
            .into_data()?;

        Ok(parse_recent_feeds(&data))
    }
}

fn comment_request(url: &str, token: String, uin: i64, post: &Post, content: &str) -> ApiRequest {
    ApiRequest::post(url)
        .query("g_tk", token)
        .form("topicId", format!("{}_{}__1", post.uin, post.tid))
        .form("uin", uin)
        .form("hostUin", post.uin)
        .form("feedsType", 100)
        .form("inCharset", "utf-8")
        .form("outCharset", "utf-8")
        .form("plat", "qzone")
        .form("source", "ic")
        .form("platformid", 52)
        .form("format", "fs")
        .form("ref", "feeds")
        .form("content", content)
}

/// Keep session failures as `Err`; report everything else as a failed result.
fn fold(outcome: Result<ApiResult>) -> Result<ApiResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(e) if e.is_session_error() => Err(e),
        Err(e) => {
            warn!(code = e.code(), error = %e, "Request failed");
            Ok(ApiResult::from_error(&e))
        }
    }
}
