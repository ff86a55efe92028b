//! Testing utilities including mock implementations.
//!
//! These let applications exercise the client without network access or a
//! real QQ login.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::credentials::CredentialSource;
use crate::error::{QzoneError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Mock transport with canned responses per URL.
///
/// Queued responses are served first-in first-out; once a URL's queue is
/// empty its default response (if any) is repeated. Every request is recorded.
///
/// # Example
///
/// ```rust
/// use qzone_client::testing::MockTransport;
/// use qzone_client::HttpResponse;
///
/// let transport = MockTransport::new();
/// transport.push("https://example.com/api", HttpResponse::new(401, ""));
/// transport.push("https://example.com/api", HttpResponse::new(200, r#"{"code":0}"#));
/// ```
#[derive(Default, Clone)]
pub struct MockTransport {
    queued: Arc<RwLock<HashMap<String, VecDeque<HttpResponse>>>>,
    defaults: Arc<RwLock<HashMap<String, HttpResponse>>>,
    requests: Arc<RwLock<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next request to `url`.
    pub fn push(&self, url: &str, response: HttpResponse) {
        self.queued
            .write()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Response repeated once the queue for `url` is drained.
    pub fn set_default(&self, url: &str, response: HttpResponse) {
        self.defaults
            .write()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_response(self, url: &str, response: HttpResponse) -> Self {
        self.push(url, response);
        self
    }

    /// All recorded requests, in send order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().unwrap().clone()
    }

    /// Number of requests sent to `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub fn reset_calls(&self) {
        self.requests.write().unwrap().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.requests.write().unwrap().push(request);

        let queued = self
            .queued
            .write()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return Ok(response);
        }

        self.defaults
            .read()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| {
                QzoneError::Http(Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no mock response for {url}"),
                )))
            })
    }
}

/// Mock credential source returning a configurable cookie string.
#[derive(Clone)]
pub struct MockCredentials {
    cookies: Arc<RwLock<std::result::Result<String, String>>>,
    calls: Arc<RwLock<usize>>,
    delay: Option<Duration>,
}

impl MockCredentials {
    pub fn new(cookies: impl Into<String>) -> Self {
        Self {
            cookies: Arc::new(RwLock::new(Ok(cookies.into()))),
            calls: Arc::new(RwLock::new(0)),
            delay: None,
        }
    }

    /// A source whose every call fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        let mock = Self::new("");
        *mock.cookies.write().unwrap() = Err(reason.into());
        mock
    }

    /// Sleep before answering, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the cookie string served from now on.
    pub fn set_cookies(&self, cookies: impl Into<String>) {
        *self.cookies.write().unwrap() = Ok(cookies.into());
    }

    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

#[async_trait]
impl CredentialSource for MockCredentials {
    async fn cookies(&self, _domain: &str) -> Result<String> {
        *self.calls.write().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.cookies
            .read()
            .unwrap()
            .clone()
            .map_err(QzoneError::Credentials)
    }
}
