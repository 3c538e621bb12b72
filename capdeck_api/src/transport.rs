use std::{borrow::Cow, fmt, future::Future, sync::Arc, time::Duration};

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::trace;
use url::Url;

/// Every resource lives under `/api/v1`.
pub const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Only POST and PUT send a body, whatever the caller attached.
    pub fn carries_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<Cow<'static, str>>,
    pub body: Option<Value>,
    /// False for site assets that live outside `/api/v1`.
    pub prefixed: bool,
}

impl ApiRequest {
    /// `path` is relative to the API prefix, e.g. `/shader/list`.
    pub fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(Cow::Borrowed)
                .collect(),
            body: None,
            prefixed: true,
        }
    }

    /// A GET for a site asset, e.g. `/assets/thumbnails/crt.png`.
    pub fn asset(path: &str) -> Self {
        Self {
            method: Method::Get,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| Cow::Owned(s.to_owned()))
                .collect(),
            body: None,
            prefixed: false,
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &'static str, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn delete(path: &'static str) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends one path segment. Segments are percent-encoded on the wire.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<Cow<'static, str>>) -> Self {
        self.segments.push(segment.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Unencoded path below the API prefix, e.g. `/presets/My Preset/apply`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Path as seen by the server, API prefix included.
    pub fn full_path(&self) -> String {
        if self.prefixed {
            format!("/{}{}", API_PREFIX.join("/"), self.path())
        } else {
            self.path()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid base url {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Moves one request to the backend and returns whatever came back.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

/// Transport over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;

        if base.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_owned()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            if request.prefixed {
                segments.extend(API_PREFIX);
            }
            segments.extend(request.segments.iter());
        }
        url
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
    ) -> Result<RawResponse, TransportError> {
        let url = self.url_for(request);
        trace!("{} {url}", request.method);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");

        if request.method.carries_body()
            && let Some(body) = &request.body
        {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_split_and_join() {
        let req = ApiRequest::get("/shader/list");
        assert_eq!(req.segments, vec!["shader", "list"]);
        assert_eq!(req.path(), "/shader/list");
        assert_eq!(req.full_path(), "/api/v1/shader/list");
    }

    #[test]
    fn dynamic_segments_are_encoded_in_the_url() {
        let transport = HttpTransport::new(
            "http://device.local:8080/panel/",
            Duration::from_secs(1),
        )
        .unwrap();

        let req = ApiRequest::new(Method::Post, "/presets")
            .segment("My Preset/2".to_string())
            .segment("apply");

        assert_eq!(req.path(), "/presets/My Preset/2/apply");
        assert_eq!(
            transport.url_for(&req).as_str(),
            "http://device.local:8080/panel/api/v1/presets/My%20Preset%2F2/apply"
        );
    }

    #[test]
    fn assets_skip_the_api_prefix() {
        let transport =
            HttpTransport::new("http://device.local:8080", Duration::from_secs(1))
                .unwrap();
        let req = ApiRequest::asset("/assets/thumbnails/crt.png");

        assert_eq!(req.full_path(), "/assets/thumbnails/crt.png");
        assert_eq!(
            transport.url_for(&req).as_str(),
            "http://device.local:8080/assets/thumbnails/crt.png"
        );
        assert_eq!(ApiRequest::asset("/").full_path(), "/");
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            HttpTransport::new("mailto:x@y", Duration::from_secs(1)),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
    }
}
