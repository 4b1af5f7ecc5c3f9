//! Transport boundary for forge REST calls.
//!
//! Platform clients never talk to `reqwest` directly; they build an
//! [`HttpRequest`] and hand it to an [`HttpTransport`]. Tests swap in
//! [`MockTransport`] to script responses without opening sockets.

use async_trait::async_trait;
use thiserror::Error;

/// Methods the forge clients use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Body decoded as UTF-8, lossy. Handy in assertions.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(any(feature = "github", feature = "gitlab", feature = "gitea"))]
pub mod reqwest_transport {
    use super::*;

    use std::time::Duration as StdDuration;

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Build a transport whose every request is bounded by `timeout`.
        pub fn with_timeout(timeout: StdDuration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
                HttpMethod::Put => reqwest::Method::PUT,
                HttpMethod::Patch => reqwest::Method::PATCH,
            };

            let mut builder = self.client.request(method, &request.url);
            for (k, v) in request.headers {
                builder = builder.header(&k, &v);
            }

            if !request.body.is_empty() {
                builder = builder.body(request.body);
            }

            let resp = builder
                .send()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            let mut headers: HttpHeaders = Vec::new();
            for (name, value) in resp.headers().iter() {
                headers.push((
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                ));
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory transport for client tests.
///
/// Responses are keyed on method + full URL (query string included). An
/// unscripted request fails like a dropped connection.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for a method + URL.
    ///
    /// If multiple responses are registered for the same key, they are returned
    /// in FIFO order.
    pub fn push_response(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        response: HttpResponse,
    ) {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner
            .routes
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        let inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.requests.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");

        let key = (request.method, request.url.clone());
        inner.requests.push(request);

        inner
            .routes
            .get_mut(&key)
            .and_then(|q| q.pop_front())
            .ok_or_else(|| {
                let (method, url) = &key;
                HttpError::Transport(format!("no response scripted for {} {url}", method.as_str()))
            })
    }
}

/// Build a response for client tests.
#[cfg(test)]
pub(crate) fn mock_response(
    status: u16,
    headers: Vec<(&str, &str)>,
    body: impl AsRef<[u8]>,
) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: body.as_ref().to_vec(),
    }
}
