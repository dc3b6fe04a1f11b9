//! HTTP transport.
//!
//! The [`Transport`] trait is the seam between request handling and the
//! network: given a [`Request`], produce a [`Response`] or a transport error.
//! [`HttpTransport`] is the pooled hyper client used by default; tests plug
//! in their own.
//!
//! Requests go out with exactly the headers they carry. In particular no
//! `Accept` header is added when the request has none.

use crate::client::ClientConfig;
use crate::error::{RegentError, Result};
use crate::request::{Body, Request};
use crate::response::Response;
use bytes::Bytes;
use http::header::{
    AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName,
    HeaderValue, LOCATION, PROXY_AUTHORIZATION, TRANSFER_ENCODING,
};
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::future::Future;
use std::time::Duration;
use url::Url;

#[cfg(test)]
pub(crate) mod mock;
mod tls;
#[cfg(test)]
mod tests;

/// Idle pooled connections are closed after this long.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Headers dropped when a redirect leaves the original origin.
const SENSITIVE_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION];

/// Executes a single HTTP exchange.
///
/// Implementations only move bytes; request validation and authentication
/// happen before a request reaches the transport.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Validates `request` and hands it to `transport`.
///
/// A request that fails [`Request::check`] is rejected here, so the
/// transport never sees it.
pub(crate) async fn dispatch<T: Transport>(
    transport: &T,
    request: &Request,
    debug: bool,
) -> Result<Response> {
    request.check()?;

    if debug {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            query = ?request.query(),
            headers = ?redact(request.headers()),
            "sending request"
        );
    }

    let response = transport.execute(request).await?;

    tracing::debug!(
        method = %request.method(),
        url = %request.url(),
        status = response.status().as_u16(),
        "received response"
    );
    if debug {
        tracing::debug!(headers = ?redact(response.headers()), "response headers");
    }

    Ok(response)
}

/// Lists headers as strings with the `Authorization` value hidden.
pub fn redact(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION {
                "[REDACTED]".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.to_string(), value)
        })
        .collect()
}

type PooledClient = HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Transport backed by a pooled hyper client with rustls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// The underlying HTTP client
    http_client: PooledClient,
    /// Limit for one whole exchange, redirects and body included
    timeout: Duration,
    /// Redirects followed before giving up
    max_redirects: usize,
}

impl HttpTransport {
    /// Builds the HTTP client from the connection settings in `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::client::ClientConfig;
    /// use libregent::transport::HttpTransport;
    ///
    /// let config = ClientConfig::new("http://localhost:5000");
    /// let transport = HttpTransport::new(&config).unwrap();
    /// ```
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let tls_config = tls::client_config(config.insecure_skip_tls_verify)?;
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(connector);

        Ok(Self {
            http_client,
            timeout: Duration::from_secs(config.timeout_seconds),
            max_redirects: config.max_redirects,
        })
    }

    /// Sends `request`, following redirects, and buffers the final body.
    async fn exchange(&self, request: &Request) -> Result<Response> {
        let mut target = target_url(request)?;
        let mut method = request.method().clone();
        let mut headers = request.headers().clone();
        let mut body = encode_body(request.body(), &mut headers, request.url())?;
        let mut redirects = 0;

        loop {
            let response = self.send(&method, &target, &headers, body.clone()).await?;
            let status = response.status();

            let next = match response.headers().get(LOCATION) {
                Some(location) if is_followed_redirect(status) => location
                    .to_str()
                    .ok()
                    .and_then(|location| target.join(location).ok()),
                _ => None,
            };

            let Some(next) = next else {
                let (parts, incoming) = response.into_parts();
                let collected = incoming.collect().await.map_err(|e| {
                    RegentError::transport_with_source(
                        format!("Failed to read response from {}", target),
                        e,
                    )
                })?;
                return Ok(Response::new(
                    parts.status,
                    parts.headers,
                    collected.to_bytes().to_vec(),
                    target.to_string(),
                ));
            };

            if redirects >= self.max_redirects {
                return Err(RegentError::transport(format!(
                    "Too many redirects for {} (limit {})",
                    request.url(),
                    self.max_redirects
                )));
            }
            redirects += 1;

            if matches!(
                status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            ) {
                body = Bytes::new();
                for name in [TRANSFER_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, CONTENT_LENGTH] {
                    headers.remove(name);
                }
                if method != Method::GET && method != Method::HEAD {
                    method = Method::GET;
                }
            }
            if target.origin() != next.origin() {
                for name in SENSITIVE_HEADERS {
                    headers.remove(name);
                }
            }

            tracing::debug!(
                from = %target,
                to = %next,
                status = status.as_u16(),
                "following redirect"
            );
            target = next;
        }
    }

    async fn send(
        &self,
        method: &Method,
        target: &Url,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<http::Response<Incoming>> {
        let uri: Uri = target.as_str().parse().map_err(|e| {
            RegentError::transport_with_source(format!("Failed to build request for {}", target), e)
        })?;

        let mut outgoing = http::Request::new(Full::new(body));
        *outgoing.method_mut() = method.clone();
        *outgoing.uri_mut() = uri;
        *outgoing.headers_mut() = headers.clone();

        self.http_client
            .request(outgoing)
            .await
            .map_err(|e| self.translate_error(e, target))
    }

    /// Translates a client error into a RegentError.
    fn translate_error(&self, error: hyper_util::client::legacy::Error, url: &Url) -> RegentError {
        if error.is_connect() {
            RegentError::transport_with_source(format!("Failed to connect to {}", url), error)
        } else {
            RegentError::transport_with_source(format!("Failed to send request to {}", url), error)
        }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<Response> {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(elapsed) => Err(RegentError::transport_with_source(
                format!(
                    "Request to {} timed out after {} seconds",
                    request.url(),
                    self.timeout.as_secs()
                ),
                elapsed,
            )),
        }
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Parses the request URL and appends its query parameters.
fn target_url(request: &Request) -> Result<Url> {
    let mut target = Url::parse(request.url()).map_err(|e| {
        RegentError::transport_with_source(
            format!("Failed to build request for {}", request.url()),
            e,
        )
    })?;
    if !request.query().is_empty() {
        target.query_pairs_mut().extend_pairs(request.query());
    }
    target.set_fragment(None);
    Ok(target)
}

/// Serializes the body. A JSON body gets `Content-Type: application/json`
/// unless the request already names one.
fn encode_body(body: &Body, headers: &mut HeaderMap, url: &str) -> Result<Bytes> {
    match body {
        Body::Empty => Ok(Bytes::new()),
        Body::Bytes(bytes) => Ok(Bytes::from(bytes.clone())),
        Body::Json(value) => {
            let bytes = serde_json::to_vec(value).map_err(|e| {
                RegentError::transport_with_source(format!("Failed to build request for {}", url), e)
            })?;
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static("application/json"));
            Ok(Bytes::from(bytes))
        }
    }
}
