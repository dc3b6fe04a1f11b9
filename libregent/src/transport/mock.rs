//! Recording transport for unit tests.

use super::Transport;
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use http::StatusCode;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// Answers every request with `handler` and records what it was sent.
pub(crate) struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request received, in order.
    pub(crate) fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests whose URL starts with `prefix`.
    pub(crate) fn calls_to(&self, prefix: &str) -> Vec<Request> {
        self.calls()
            .into_iter()
            .filter(|r| r.url().starts_with(prefix))
            .collect()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.call_count())
            .finish()
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: &Request) -> Result<Response> {
        self.calls.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// Builds a canned response.
pub(crate) fn response(status: u16, headers: &[(&str, &str)], body: &str) -> Response {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    Response::new(
        StatusCode::from_u16(status).unwrap(),
        map,
        body.as_bytes().to_vec(),
        "",
    )
}
