//! Fixed protocol values: endpoints, business codes and synthetic messages.

// =============================================================================
// Endpoints
// =============================================================================

pub const BASE_URL: &str = "https://user.qzone.qq.com";

/// Domain the credential source is asked for cookies of.
pub const COOKIE_DOMAIN: &str = "user.qzone.qq.com";

pub const UPLOAD_IMAGE_URL: &str = "https://up.qzone.qq.com/cgi-bin/upload/cgi_upload_image";
pub const EMOTION_URL: &str =
    "https://user.qzone.qq.com/proxy/domain/taotao.qzone.qq.com/cgi-bin/emotion_cgi_publish_v6";
pub const DOLIKE_URL: &str =
    "https://user.qzone.qq.com/proxy/domain/w.qzone.qq.com/cgi-bin/likes/internal_dolike_app";
pub const LIST_URL: &str =
    "https://user.qzone.qq.com/proxy/domain/taotao.qq.com/cgi-bin/emotion_cgi_msglist_v6";
pub const COMMENT_URL: &str =
    "https://user.qzone.qq.com/proxy/domain/taotao.qzone.qq.com/cgi-bin/emotion_cgi_re_feeds";
pub const ZONE_LIST_URL: &str =
    "https://user.qzone.qq.com/proxy/domain/ic2.qzone.qq.com/cgi-bin/feeds/feeds3_html_more";
pub const VISITOR_URL: &str =
    "https://h5.qzone.qq.com/proxy/domain/g.qzone.qq.com/cgi-bin/friendshow/cgi_get_visitor_more";
pub const REPLY_URL: &str =
    "https://h5.qzone.qq.com/proxy/domain/taotao.qzone.qq.com/cgi-bin/emotion_cgi_re_feeds";
pub const DELETE_URL: &str =
    "https://h5.qzone.qq.com/proxy/domain/taotao.qzone.qq.com/cgi-bin/emotion_cgi_delete_v6";
pub const DETAIL_URL: &str =
    "https://h5.qzone.qq.com/proxy/domain/taotao.qq.com/cgi-bin/emotion_cgi_msgdetail_v6";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Application id of plain status posts ("shuoshuo").
pub const APPID_SHUOSHUO: &str = "311";

/// Host prefix of decorative emoji icons inside feed HTML.
pub const EMOJI_ICON_HOST: &str = "http://qzonestyle.gtimg.cn";

// =============================================================================
// Business codes
// =============================================================================

pub const CODE_OK: i64 = 0;
pub const CODE_UNKNOWN: i64 = -1;
pub const CODE_LOGIN_EXPIRED: i64 = -3000;
pub const CODE_PERMISSION_DENIED: i64 = 403;
pub const CODE_PERMISSION_DENIED_LEGACY: i64 = -403;

// =============================================================================
// HTTP statuses the executor accepts
// =============================================================================

pub const HTTP_OK: u16 = 200;
pub const HTTP_UNAUTHORIZED: u16 = 401;
pub const HTTP_FORBIDDEN: u16 = 403;

pub const ALLOWED_STATUSES: &[u16] = &[HTTP_OK, HTTP_UNAUTHORIZED, HTTP_FORBIDDEN];

// =============================================================================
// Synthetic messages and internal keys
// =============================================================================

pub const MSG_PERMISSION_DENIED: &str = "permission denied";

/// Key the executor injects into parsed bodies to carry transport metadata.
pub const INTERNAL_META_KEY: &str = "__qzone_internal__";
pub const INTERNAL_HTTP_STATUS_KEY: &str = "http_status";
