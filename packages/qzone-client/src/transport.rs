//! HTTP transport seam.
//!
//! The executor only sees [`Transport`]; production uses [`ReqwestTransport`],
//! tests use `testing::MockTransport`.

use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::USER_AGENT;
use crate::error::{QzoneError, Result};

/// One outgoing request, fully resolved.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Url-encoded form body
    pub form: Option<Vec<(String, String)>>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Form value by key, for assertions and logging.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one request and returns status plus body, whatever the status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl ReqwestTransport {
    /// Create a transport with a default per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "HTTP request");

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = request.cookie_header() {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                QzoneError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                warn!(url = %request.url, error = %e, "HTTP request failed");
                QzoneError::Http(Box::new(e))
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_err)?;

        debug!(url = %request.url, status, bytes = body.len(), "HTTP response");
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_joined() {
        let mut request = HttpRequest::get("https://example.com");
        assert_eq!(request.cookie_header(), None);

        request.cookies = vec![
            ("uin".into(), "o1".into()),
            ("skey".into(), "@k".into()),
        ];
        assert_eq!(request.cookie_header().as_deref(), Some("uin=o1; skey=@k"));
    }

    #[test]
    fn test_lookup_helpers() {
        let mut request = HttpRequest::new(Method::POST, "https://example.com");
        request.query.push(("g_tk".into(), "5381".into()));
        request.form = Some(vec![("con".into(), "hello".into())]);

        assert_eq!(request.query_value("g_tk"), Some("5381"));
        assert_eq!(request.form_value("con"), Some("hello"));
        assert_eq!(request.form_value("missing"), None);
    }

    #[test]
    fn test_response_text_is_lossy() {
        let response = HttpResponse::new(200, vec![b'o', b'k', 0xFF]);
        assert_eq!(response.text(), "ok\u{FFFD}");
    }
}
