//! Resilient request executor.
//!
//! Sends one request through the [`Transport`], normalizes the body and
//! classifies the outcome. An expired login (HTTP 401 or code `-3000`)
//! invalidates the session and resends the request, rebuilt from the fresh
//! context, up to `max_auth_retries` times. Nothing else is retried.

use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::constants::{
    ALLOWED_STATUSES, CODE_LOGIN_EXPIRED, CODE_PERMISSION_DENIED, CODE_UNKNOWN, HTTP_FORBIDDEN,
    HTTP_UNAUTHORIZED, INTERNAL_HTTP_STATUS_KEY, INTERNAL_META_KEY, MSG_PERMISSION_DENIED,
};
use crate::error::{QzoneError, Result};
use crate::parser::{code_value, parse_response, ApiResult, ResultKeys};
use crate::session::{Session, SessionContext};
use crate::transport::{HttpRequest, Transport};

/// Request description produced from the current session context.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    /// Replaces the session's default headers when set
    pub headers: Option<Vec<(String, String)>>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: None,
            headers: None,
            timeout: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, key: &str, value: impl ToString) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((key.to_string(), value.to_string()));
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Authenticated executor shared by every façade operation.
pub struct QzoneHttpClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    config: ClientConfig,
}

impl QzoneHttpClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>, config: ClientConfig) -> Self {
        Self {
            transport,
            session,
            config,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a request with login-expiry recovery and return the parsed body.
    ///
    /// `build` is called once per attempt so a resend carries the token of
    /// the re-derived session. The returned body carries
    /// `__qzone_internal__.http_status`.
    pub async fn execute<F>(&self, build: F) -> Result<Map<String, Value>>
    where
        F: Fn(&SessionContext) -> ApiRequest + Send + Sync,
    {
        let mut relogins = 0u32;

        loop {
            let ctx = self.session.get().await?;
            let request = build(ctx.as_ref());
            let url = request.url.clone();
            let response = self.transport.send(self.resolve(request, &ctx)).await?;
            let status = response.status;

            if !ALLOWED_STATUSES.contains(&status) {
                warn!(url = %url, status, "Unexpected HTTP status");
                return Err(QzoneError::Transport { status, url });
            }

            let mut body = match parse_response(&response.text()) {
                Ok(body) => body,
                Err(e) if status == HTTP_UNAUTHORIZED || status == HTTP_FORBIDDEN => {
                    debug!(url = %url, status, error = %e, "Unparsable body on auth failure");
                    Map::new()
                }
                Err(e) => return Err(e.into()),
            };
            inject_status(&mut body, status);

            let code = body_code(&body);
            if status == HTTP_UNAUTHORIZED || code == Some(CODE_LOGIN_EXPIRED) {
                if relogins >= self.config.max_auth_retries {
                    warn!(url = %url, retries = relogins, "Login still expired, giving up");
                    return Err(QzoneError::AuthExpired { retries: relogins });
                }
                relogins += 1;
                warn!(url = %url, status, attempt = relogins, "Login expired, logging in again");
                self.session.invalidate(&ctx).await;
                continue;
            }

            if status == HTTP_FORBIDDEN && matches!(code, None | Some(CODE_UNKNOWN)) {
                body.insert("code".into(), json!(CODE_PERMISSION_DENIED));
                body.insert("message".into(), json!(MSG_PERMISSION_DENIED));
            }

            return Ok(body);
        }
    }

    /// [`execute`](Self::execute) followed by result normalization.
    pub async fn execute_result<F>(&self, keys: ResultKeys, build: F) -> Result<ApiResult>
    where
        F: Fn(&SessionContext) -> ApiRequest + Send + Sync,
    {
        let body = self.execute(build).await?;
        Ok(ApiResult::from_raw_with(body, keys))
    }

    /// Plain GET without session cookies, for fetching remote images.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = HttpRequest::get(url);
        request.headers = vec![("User-Agent".into(), self.config.user_agent.clone())];
        request.timeout = Some(self.config.timeout);

        let response = self.transport.send(request).await?;
        if !(200..300).contains(&response.status) {
            return Err(QzoneError::Transport {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    fn resolve(&self, request: ApiRequest, ctx: &SessionContext) -> HttpRequest {
        let headers = request.headers.unwrap_or_else(|| {
            ctx.headers()
                .into_iter()
                .map(|(name, value)| {
                    if name.eq_ignore_ascii_case("user-agent") {
                        (name, self.config.user_agent.clone())
                    } else {
                        (name, value)
                    }
                })
                .collect()
        });

        HttpRequest {
            method: request.method,
            url: request.url,
            query: request.query,
            form: request.form,
            headers,
            cookies: ctx.cookies(),
            timeout: Some(request.timeout.unwrap_or(self.config.timeout)),
        }
    }
}

fn inject_status(body: &mut Map<String, Value>, status: u16) {
    let meta = body
        .entry(INTERNAL_META_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if let Value::Object(meta) = meta {
        meta.insert(INTERNAL_HTTP_STATUS_KEY.into(), json!(status));
    }
}

/// `code` of a parsed body; `None` when absent or not numeric.
fn body_code(body: &Map<String, Value>) -> Option<i64> {
    code_value(body.get("code"))
}
