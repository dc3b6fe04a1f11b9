//! Registry responses.
//!
//! [`Response`] holds a completed exchange: status, headers and the full
//! body. Helpers here read the `Location` header that upload endpoints
//! return and the `{"errors": [...]}` body that registries send on failure.

use crate::error::{RegentError, Result};
use http::StatusCode;
use http::header::{HeaderMap, LOCATION, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::{ParseError, Url};


/// One entry of a registry error body.
///
/// # Examples
///
/// ```
/// use libregent::response::RegistryError;
///
/// let err: RegistryError = serde_json::from_str(
///     r#"{"code":"BLOB_UNKNOWN","message":"blob unknown to registry","detail":"sha256:abc"}"#,
/// ).unwrap();
/// assert_eq!(err.code, "BLOB_UNKNOWN");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryError {
    /// Machine-readable code, e.g. `BLOB_UNKNOWN` or `MANIFEST_INVALID`
    pub code: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Unstructured detail; `null` when absent
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Body shape of registry error responses.
#[derive(Debug, Deserialize)]
struct ErrorList {
    errors: Vec<RegistryError>,
}

/// A response returned from a registry.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    url: String,
}

impl Response {
    /// Creates a response. `url` is the final URL of the exchange and may be
    /// empty when unknown.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>, url: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body,
            url: url.into(),
        }
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the URL the response came from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true for 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Returns the path and query of the `Location` header.
    ///
    /// A relative location is not resolved against anything: its path is
    /// returned as written, so `uploads/abc?x=1` stays `uploads/abc?x=1`.
    /// Returns an empty string if the header is missing or cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::response::Response;
    /// use http::StatusCode;
    /// use http::header::{HeaderMap, HeaderValue, LOCATION};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert(LOCATION, HeaderValue::from_static("http://host/v2/blobs/uploads/abc?_state=x"));
    /// let resp = Response::new(StatusCode::ACCEPTED, headers, Vec::new(), "");
    /// assert_eq!(resp.relative_location(), "/v2/blobs/uploads/abc?_state=x");
    /// ```
    pub fn relative_location(&self) -> String {
        let Some(location) = self.header(LOCATION.as_str()) else {
            return String::new();
        };

        match Url::parse(location) {
            Ok(parsed) => path_and_query(parsed.path(), parsed.query()),
            Err(ParseError::RelativeUrlWithoutBase) => relative_reference(location),
            Err(_) => String::new(),
        }
    }

    /// Returns the `Location` header exactly as sent, or an empty string.
    pub fn absolute_location(&self) -> String {
        self.header(LOCATION.as_str()).unwrap_or_default().to_string()
    }

    /// Parses the registry error list from the body.
    ///
    /// # Errors
    ///
    /// Returns [`RegentError::MalformedErrorBody`] if the body is not a JSON
    /// object with an `errors` array.
    pub fn errors(&self) -> Result<Vec<RegistryError>> {
        serde_json::from_slice::<ErrorList>(&self.body)
            .map(|list| list.errors)
            .map_err(|source| RegentError::MalformedErrorBody { source })
    }

    /// Turns a non-success response into a typed error.
    ///
    /// The error message uses the first registry error in the body when
    /// there is one, and the raw body otherwise.
    pub fn check_status(self) -> Result<Self> {
        let status = self.status;
        if status.is_success() {
            return Ok(self);
        }

        let url = self.url.clone();
        let detail = self.error_message();

        Err(match status {
            StatusCode::UNAUTHORIZED => RegentError::Authentication {
                message: format!("Authentication required for {}: {}", url, detail),
                status_code: status.as_u16(),
            },
            StatusCode::FORBIDDEN => RegentError::Authentication {
                message: format!("Access forbidden for {}: {}", url, detail),
                status_code: status.as_u16(),
            },
            StatusCode::NOT_FOUND => RegentError::NotFound { url },
            StatusCode::TOO_MANY_REQUESTS => RegentError::RateLimit {
                message: format!("Rate limit exceeded for {}", url),
                retry_after: self.retry_after(),
            },
            s if s.is_server_error() => RegentError::Server {
                message: format!("Server error from {}: {}", url, detail),
                status_code: s.as_u16(),
            },
            s => RegentError::UnexpectedStatus {
                message: format!("HTTP {} from {}: {}", s.as_u16(), url, detail),
                status_code: s.as_u16(),
            },
        })
    }

    /// Reads `Retry-After` given in seconds.
    fn retry_after(&self) -> Option<u64> {
        self.header(RETRY_AFTER.as_str())
            .and_then(|v| v.trim().parse().ok())
    }

    fn error_message(&self) -> String {
        match self.errors() {
            Ok(errors) if !errors.is_empty() => errors[0].to_string(),
            _ => {
                let text = self.text();
                if text.trim().is_empty() {
                    self.status
                        .canonical_reason()
                        .unwrap_or("(empty body)")
                        .to_string()
                } else {
                    text
                }
            }
        }
    }
}

/// Splits a relative reference into path and query, dropping any fragment
/// and, for `//host/...` references, the authority.
fn relative_reference(reference: &str) -> String {
    let reference = reference.split_once('#').map_or(reference, |(r, _)| r);
    let reference = match reference.strip_prefix("//") {
        Some(rest) => rest.find(['/', '?']).map_or("", |i| &rest[i..]),
        None => reference,
    };

    match reference.split_once('?') {
        Some((path, query)) => path_and_query(path, Some(query)),
        None => path_and_query(reference, None),
    }
}

fn path_and_query(path: &str, query: Option<&str>) -> String {
    let mut out = path.to_string();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        out.push('?');
        out.push_str(query);
    }
    out
}
