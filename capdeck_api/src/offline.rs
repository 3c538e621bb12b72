//! Offline response cache.
//!
//! [`CachingTransport`] wraps another transport and answers from memory when
//! the network is gone. Site pages and scripts are served cache-first, API
//! reads go to the network first and fall back to the last good answer, or to
//! a synthesized `503 Offline` envelope when nothing was cached yet.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::debug;

use crate::transport::{
    ApiRequest, Method, RawResponse, Transport, TransportError,
};

pub const OFFLINE_MESSAGE: &str = "No connection to the server";

/// Page shell stored by [`CachingTransport::precache`].
pub const PRECACHE_PATHS: [&str; 5] =
    ["/", "/index.html", "/style.css", "/control.js", "/api.js"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Page shell and scripts: answer from cache, fill on miss.
    CacheFirst,
    /// API reads: network, then cache, then a synthesized 503.
    ApiNetworkFirst,
    /// Anything else: network, then cache.
    NetworkFirst,
}

pub fn classify(path: &str) -> CacheStrategy {
    if path.starts_with("/api/") {
        CacheStrategy::ApiNetworkFirst
    } else if path == "/"
        || path == "/index.html"
        || path.ends_with(".css")
        || path.ends_with(".js")
    {
        CacheStrategy::CacheFirst
    } else {
        CacheStrategy::NetworkFirst
    }
}

pub fn offline_response() -> RawResponse {
    RawResponse::new(
        503,
        json!({ "error": "Offline", "message": OFFLINE_MESSAGE }).to_string(),
    )
}

#[derive(Debug, Default)]
struct Caches {
    /// Page shell.
    fixed: FxHashMap<String, RawResponse>,
    /// Everything fetched at runtime.
    runtime: FxHashMap<String, RawResponse>,
}

#[derive(Debug)]
pub struct CachingTransport<T> {
    inner: T,
    caches: Mutex<Caches>,
}

impl<T: Transport> CachingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            caches: Mutex::new(Caches::default()),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Fills the page-shell cache ahead of time. Returns how many pages were
    /// stored. Stops at the first transport error.
    pub async fn precache(&self) -> usize {
        let mut stored = 0;
        for path in PRECACHE_PATHS {
            let request = ApiRequest::asset(path);
            match self.inner.send(&request).await {
                Ok(response) if response.status == 200 => {
                    self.store(CacheStrategy::CacheFirst, request.full_path(), &response);
                    stored += 1;
                }
                Ok(response) => {
                    debug!("precaching {path} answered {}", response.status);
                }
                Err(e) => {
                    debug!("precaching stopped at {path}: {e}");
                    break;
                }
            }
        }
        stored
    }

    pub fn cached(&self, path: &str) -> Option<RawResponse> {
        let caches = self.caches.lock();
        caches
            .fixed
            .get(path)
            .or_else(|| caches.runtime.get(path))
            .cloned()
    }

    fn store(&self, strategy: CacheStrategy, path: String, response: &RawResponse) {
        if response.status != 200 {
            return;
        }
        let mut caches = self.caches.lock();
        let cache = match strategy {
            CacheStrategy::CacheFirst => &mut caches.fixed,
            _ => &mut caches.runtime,
        };
        cache.insert(path, response.clone());
    }
}

impl<T: Transport> Transport for CachingTransport<T> {
    async fn send(
        &self,
        request: &ApiRequest,
    ) -> Result<RawResponse, TransportError> {
        if request.method != Method::Get {
            return self.inner.send(request).await;
        }

        let path = request.full_path();
        let strategy = classify(&path);

        if strategy == CacheStrategy::CacheFirst
            && let Some(hit) = self.cached(&path)
        {
            return Ok(hit);
        }

        match self.inner.send(request).await {
            Ok(response) => {
                self.store(strategy, path, &response);
                Ok(response)
            }
            Err(e) if strategy == CacheStrategy::CacheFirst => Err(e),
            Err(e) => {
                if let Some(hit) = self.cached(&path) {
                    debug!("offline, serving {path} from cache");
                    return Ok(hit);
                }
                match strategy {
                    CacheStrategy::ApiNetworkFirst => {
                        debug!("offline, no cached copy of {path}");
                        Ok(offline_response())
                    }
                    _ => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn routes_are_classified() {
        assert_eq!(classify("/"), CacheStrategy::CacheFirst);
        assert_eq!(classify("/index.html"), CacheStrategy::CacheFirst);
        assert_eq!(classify("/style.css"), CacheStrategy::CacheFirst);
        assert_eq!(classify("/control.js"), CacheStrategy::CacheFirst);
        assert_eq!(classify("/api/v1/status"), CacheStrategy::ApiNetworkFirst);
        assert_eq!(
            classify("/assets/thumbnails/crt.png"),
            CacheStrategy::NetworkFirst
        );
    }

    #[tokio::test]
    async fn api_falls_back_to_last_good_response() {
        let mock = MockTransport::new()
            .respond(Method::Get, "/status", 200, r#"{"clientCount": 2}"#)
            .fail(Method::Get, "/status", "connection refused");
        let transport = CachingTransport::new(mock);
        let req = ApiRequest::get("/status");

        let first = transport.send(&req).await.unwrap();
        let second = transport.send(&req).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.inner().requests().len(), 2);
    }

    #[tokio::test]
    async fn api_without_cache_synthesizes_offline() {
        let mock = MockTransport::new().fail(Method::Get, "/status", "down");
        let transport = CachingTransport::new(mock);

        let response = transport.send(&ApiRequest::get("/status")).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(response.body.contains("Offline"));
    }

    #[tokio::test]
    async fn only_ok_responses_are_stored() {
        let mock = MockTransport::new()
            .respond(Method::Get, "/presets", 500, r#"{"error": "boom"}"#)
            .fail(Method::Get, "/presets", "down");
        let transport = CachingTransport::new(mock);
        let req = ApiRequest::get("/presets");

        assert_eq!(transport.send(&req).await.unwrap().status, 500);
        assert_eq!(transport.send(&req).await.unwrap().status, 503);
    }

    #[tokio::test]
    async fn page_shell_is_cache_first() {
        let mock =
            MockTransport::new().respond(Method::Get, "/index.html", 200, "<html>");
        let transport = CachingTransport::new(mock);
        let req = ApiRequest::asset("/index.html");

        transport.send(&req).await.unwrap();
        transport.send(&req).await.unwrap();

        assert_eq!(transport.inner().requests().len(), 1);
    }

    #[tokio::test]
    async fn precached_shell_is_served_offline() {
        let mock = MockTransport::new()
            .respond(Method::Get, "/", 200, "<html>")
            .respond(Method::Get, "/index.html", 200, "<html>")
            .respond(Method::Get, "/style.css", 200, "body {}")
            .respond(Method::Get, "/control.js", 404, "")
            .respond(Method::Get, "/api.js", 200, "class Api {}");
        let transport = CachingTransport::new(mock);

        assert_eq!(transport.precache().await, 4);
        assert!(transport.cached("/control.js").is_none());

        transport.inner().clear_log();
        let css = transport.send(&ApiRequest::asset("/style.css")).await.unwrap();
        assert_eq!(css.body, "body {}");
        assert!(transport.inner().requests().is_empty());
    }

    #[tokio::test]
    async fn precache_gives_up_when_unreachable() {
        let mock = MockTransport::new().fail(Method::Get, "/", "refused");
        let transport = CachingTransport::new(mock);

        assert_eq!(transport.precache().await, 0);
        assert_eq!(transport.inner().requests().len(), 1);
    }

    #[tokio::test]
    async fn writes_bypass_the_cache() {
        let mock = MockTransport::new().fail(Method::Post, "/source", "down");
        let transport = CachingTransport::new(mock);
        let req = ApiRequest::post("/source", json!({ "type": 1 }));

        assert!(transport.send(&req).await.is_err());
    }

    #[tokio::test]
    async fn other_assets_error_without_cache() {
        let mock = MockTransport::new().fail(
            Method::Get,
            "/assets/thumbnails/crt.png",
            "down",
        );
        let transport = CachingTransport::new(mock);

        let result = transport
            .send(&ApiRequest::asset("/assets/thumbnails/crt.png"))
            .await;
        assert!(result.is_err());
    }
}
