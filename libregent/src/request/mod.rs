//! Requests against registry endpoints.
//!
//! A [`Request`] is produced from a path template by
//! [`Client::new_request`](crate::client::Client::new_request). Placeholders
//! are resolved exactly once, when the request is built; the caller may then
//! add headers, query parameters and a body before handing it to
//! [`Client::execute`](crate::client::Client::execute).

use crate::auth;
use crate::error::{BoxError, RegentError, Result};
use crate::path::{self, PathParams};
use http::Method;
use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;


/// Hook invoked on a request right before it is replayed with credentials.
///
/// The hook may mutate the request, typically to restore a body that a
/// streaming source can only provide once. Returning an error aborts the
/// replay.
pub type RetryCallback = Arc<dyn Fn(&mut Request) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Per-request settings applied by [`Client::new_request`](crate::client::Client::new_request).
///
/// Options are applied in order, so a later option of the same kind wins.
#[derive(Clone)]
pub enum RequestOption {
    /// Namespace substituted for `<name>`, overriding the client default
    Name(String),
    /// Value substituted for `<reference>`
    Reference(String),
    /// Value substituted for `<digest>`
    Digest(String),
    /// Value substituted for `<session_id>`
    SessionId(String),
    /// Hook run before the authenticated replay
    RetryCallback(RetryCallback),
}

impl RequestOption {
    /// Sets the namespace for a single request.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Sets the reference for a single request.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self::Reference(reference.into())
    }

    /// Sets the digest for a single request.
    pub fn digest(digest: impl Into<String>) -> Self {
        Self::Digest(digest.into())
    }

    /// Sets the upload session ID for a single request.
    pub fn session_id(id: impl Into<String>) -> Self {
        Self::SessionId(id.into())
    }

    /// Registers a hook to run before the request is replayed after a 401.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::request::RequestOption;
    ///
    /// let option = RequestOption::retry_callback(|req| {
    ///     req.set_body("fresh body");
    ///     Ok(())
    /// });
    /// ```
    pub fn retry_callback<F>(callback: F) -> Self
    where
        F: Fn(&mut Request) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::RetryCallback(Arc::new(callback))
    }
}

impl fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(v) => f.debug_tuple("Name").field(v).finish(),
            Self::Reference(v) => f.debug_tuple("Reference").field(v).finish(),
            Self::Digest(v) => f.debug_tuple("Digest").field(v).finish(),
            Self::SessionId(v) => f.debug_tuple("SessionId").field(v).finish(),
            Self::RetryCallback(_) => f.write_str("RetryCallback(..)"),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body
    #[default]
    Empty,
    /// Raw bytes sent as-is
    Bytes(Vec<u8>),
    /// JSON document; sent with `Content-Type: application/json` unless the
    /// request already names a content type
    Json(serde_json::Value),
}

impl Body {
    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Json(_) => false,
        }
    }
}

/// A resolved HTTP request to a registry.
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Body,
    retry_callback: Option<RetryCallback>,
    /// First header problem seen while building; reported at dispatch
    invalid: Option<String>,
}

impl Request {
    /// Creates a request for an absolute URL with no headers and no body.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::Method;
    /// use libregent::request::Request;
    ///
    /// let req = Request::new(Method::GET, "https://auth.example.com/token");
    /// assert_eq!(req.url(), "https://auth.example.com/token");
    /// ```
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: Body::Empty,
            retry_callback: None,
            invalid: None,
        }
    }

    /// Resolves a path template against a base address.
    ///
    /// `default_name` is the client's namespace at build time; a
    /// [`RequestOption::Name`] overrides it.
    pub(crate) fn from_template(
        base: &str,
        default_name: &str,
        user_agent: &str,
        method: Method,
        template: &str,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Self {
        let mut params = PathParams {
            name: Some(default_name.to_string()),
            ..Default::default()
        };
        let mut retry_callback = None;

        for option in options {
            match option {
                RequestOption::Name(v) if !v.is_empty() => params.name = Some(v),
                RequestOption::Reference(v) => params.reference = Some(v),
                RequestOption::Digest(v) => params.digest = Some(v),
                RequestOption::SessionId(v) => params.session_id = Some(v),
                RequestOption::RetryCallback(cb) => retry_callback = Some(cb),
                RequestOption::Name(_) => {}
            }
        }

        let mut request = Self::new(method, path::resolve(base, template, &params));
        request.set_header(USER_AGENT.as_str(), user_agent);
        request.retry_callback = retry_callback;
        request
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the resolved URL, without query parameters.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the request body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns true if a retry callback was registered.
    pub fn has_retry_callback(&self) -> bool {
        self.retry_callback.is_some()
    }

    /// Sets a header, replacing any previous value.
    ///
    /// An invalid name or value is remembered and makes the request fail
    /// with [`RegentError::InvalidRequest`] when it is executed.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                self.invalid
                    .get_or_insert_with(|| format!("invalid header {:?}", name));
            }
        }
        self
    }

    /// Removes a header.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(name);
        self
    }

    /// Sets a query parameter, replacing any previous value for the key.
    pub fn set_query_param(&mut self, key: &str, value: &str) -> &mut Self {
        match self.query.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.query.push((key.to_string(), value.to_string())),
        }
        self
    }

    /// Sets a raw body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = Body::Bytes(body.into());
        self
    }

    /// Sets a JSON body.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        let value = serde_json::to_value(value).map_err(|e| {
            RegentError::invalid_request(format!("body is not serializable: {}", e), &self.url)
        })?;
        self.body = Body::Json(value);
        Ok(self)
    }

    /// Sets `Authorization: Basic ...` from a username and password.
    pub fn set_basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        let value = auth::basic_header_value(username, password);
        self.set_header(AUTHORIZATION.as_str(), &value)
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn set_bearer_auth(&mut self, token: &str) -> &mut Self {
        let value = auth::bearer_header_value(token);
        self.set_header(AUTHORIZATION.as_str(), &value)
    }

    /// Checks that the request may be sent.
    ///
    /// Runs before every dispatch, including the authenticated replay.
    pub fn check(&self) -> Result<()> {
        if let Some(problem) = &self.invalid {
            return Err(RegentError::invalid_request(problem.clone(), &self.url));
        }
        path::validate(&self.url).map_err(|problem| RegentError::invalid_request(problem, &self.url))
    }

    /// Runs the retry callback, if any, against this request.
    pub(crate) fn run_retry_callback(&mut self) -> Result<()> {
        match self.retry_callback.clone() {
            Some(callback) => callback(self).map_err(RegentError::retry_callback),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &crate::transport::redact(&self.headers))
            .field("query", &self.query)
            .field("body", &self.body)
            .field("retry_callback", &self.retry_callback.is_some())
            .finish()
    }
}
