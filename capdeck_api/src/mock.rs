//! Scripted in-memory backend for tests.

use std::{collections::VecDeque, time::Duration};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::transport::{
    ApiRequest, Method, RawResponse, Transport, TransportError,
};

type Scripted = Result<RawResponse, TransportError>;

/// Replays scripted responses per `(method, path)` and records every request.
///
/// Each route holds a queue; the last entry keeps answering once the queue
/// is drained. Unknown routes answer `404` with the backend's error envelope.
/// Paths are the unencoded paths below the API prefix (`/presets/crt/apply`).
/// A route with a delay records the request at once and answers after the
/// delay has passed on the tokio clock.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<FxHashMap<(Method, String), VecDeque<Scripted>>>,
    delays: Mutex<FxHashMap<(Method, String), Duration>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(scripted);
    }

    #[must_use]
    pub fn respond(
        self,
        method: Method,
        path: &str,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.push(method, path, Ok(RawResponse::new(status, body)));
        self
    }

    #[must_use]
    pub fn respond_json(self, method: Method, path: &str, body: &Value) -> Self {
        self.respond(method, path, 200, body.to_string())
    }

    #[must_use]
    pub fn fail(self, method: Method, path: &str, reason: &str) -> Self {
        self.push(
            method,
            path,
            Err(TransportError::Network(reason.to_owned())),
        );
        self
    }

    #[must_use]
    pub fn delay(self, method: Method, path: &str, by: Duration) -> Self {
        self.delays.lock().insert((method, path.to_owned()), by);
        self
    }

    /// Replaces a route's script.
    pub fn set(&self, method: Method, path: &str, status: u16, body: &Value) {
        let mut routes = self.routes.lock();
        let queue = routes.entry((method, path.to_owned())).or_default();
        queue.clear();
        queue.push_back(Ok(RawResponse::new(status, body.to_string())));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn answer(&self, request: &ApiRequest) -> Scripted {
        self.log.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let Some(queue) = routes.get_mut(&(request.method, request.path())) else {
            let body = serde_json::json!({
                "error": format!("Not found: {}", request.path()),
                "status": 404,
            });
            return Ok(RawResponse::new(404, body.to_string()));
        };

        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| {
                Err(TransportError::Network("empty script".into()))
            })
        } else {
            queue.front().cloned().unwrap_or_else(|| {
                Err(TransportError::Network("empty script".into()))
            })
        }
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        let answer = self.answer(request);
        let delay = self
            .delays
            .lock()
            .get(&(request.method, request.path()))
            .copied();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            answer
        }
    }
}
