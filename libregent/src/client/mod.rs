//! HTTP client for OCI registry communication.
//!
//! [`Client`] builds templated requests against a registry and executes
//! them, answering `401 Unauthorized` challenges transparently:
//!
//! ```no_run
//! use libregent::{Client, Method, RequestOption};
//!
//! # async fn example() -> libregent::Result<()> {
//! let client = Client::builder("https://registry.example.com")
//!     .username_password("alice", "secret")
//!     .default_name("library/alpine")
//!     .build()?;
//!
//! let request = client.new_request(
//!     Method::GET,
//!     "/v2/<name>/manifests/<reference>",
//!     [RequestOption::reference("latest")],
//! );
//! let response = client.execute(request).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use crate::auth::{Credentials, Negotiator};
use crate::error::{RegentError, Result};
use crate::request::{Request, RequestOption};
use crate::response::Response;
use crate::transport::{self, HttpTransport, Transport};
use http::Method;
use std::sync::RwLock;
use url::Url;


/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "regent/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/b0b-io/regent)"
);

/// Configuration for the client.
///
/// Built by [`ClientBuilder`]; fixed once the client exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base registry URL without a trailing slash (e.g. "https://registry.example.com")
    pub address: String,
    /// Credentials presented to the registry and to token realms
    pub credentials: Credentials,
    /// Replaces the scope a bearer challenge asks for
    pub auth_scope: Option<String>,
    /// Value of the User-Agent header
    pub user_agent: String,
    /// Accept invalid TLS certificates
    pub insecure_skip_tls_verify: bool,
    /// Log full request and response headers
    pub debug: bool,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
    /// Maximum redirects followed per request (default: 20)
    pub max_redirects: usize,
}

impl ClientConfig {
    /// Creates a configuration with default values for `address`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::client::ClientConfig;
    ///
    /// let config = ClientConfig::new("http://localhost:5000");
    /// assert_eq!(config.timeout_seconds, 30);
    /// assert_eq!(config.max_idle_per_host, 10);
    /// assert_eq!(config.max_redirects, 20);
    /// ```
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            credentials: Credentials::Anonymous,
            auth_scope: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            insecure_skip_tls_verify: false,
            debug: false,
            timeout_seconds: 30,
            max_idle_per_host: 10,
            max_redirects: 20,
        }
    }

    /// Checks the configuration and normalizes the address.
    fn validate(mut self) -> Result<Self> {
        self.address = normalize_url(&self.address)?;

        if self.user_agent.trim().is_empty() {
            return Err(RegentError::config("UserAgent is required", None));
        }

        Ok(self)
    }
}

/// Normalizes a registry URL by ensuring it has a scheme and removing trailing slashes.
///
/// Only `http` and `https` addresses with a host are accepted.
fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();

    if url.is_empty() {
        return Err(RegentError::config("Address is required", None));
    }

    // Add default scheme if missing
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };

    let url = url.trim_end_matches('/').to_string();

    let parsed = Url::parse(&url).map_err(|e| {
        RegentError::config_with_source(format!("{} is not a valid URL", url), None, e)
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none_or(str::is_empty) {
        return Err(RegentError::config(
            format!("{} is not a valid URL", url),
            None,
        ));
    }

    Ok(url)
}

/// Builder for [`Client`].
///
/// # Examples
///
/// ```
/// use libregent::Client;
///
/// let client = Client::builder("http://localhost:5000")
///     .username_password("testuser", "testpass")
///     .default_name("testname")
///     .user_agent("regent-tests")
///     .build()
///     .unwrap();
/// assert_eq!(client.default_name(), "testname");
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
    default_name: String,
}

impl ClientBuilder {
    /// Starts a builder for the registry at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(address),
            default_name: String::new(),
        }
    }

    /// Sets the registry username and password.
    pub fn username_password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Credentials::basic(username, password);
        self
    }

    /// Sets the credentials directly.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Overrides the scope provided by the authorization server.
    pub fn auth_scope(mut self, scope: impl Into<String>) -> Self {
        self.config.auth_scope = Some(scope.into());
        self
    }

    /// Sets the default namespace substituted for `<name>`.
    pub fn default_name(mut self, namespace: impl Into<String>) -> Self {
        self.default_name = namespace.into();
        self
    }

    /// Overrides the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enables or disables header dumps in debug logs.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Skips TLS certificate verification.
    pub fn insecure_skip_tls_verify(mut self, skip: bool) -> Self {
        self.config.insecure_skip_tls_verify = skip;
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn max_idle_per_host(mut self, max: usize) -> Self {
        self.config.max_idle_per_host = max;
        self
    }

    /// Sets the maximum number of redirects followed.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Validates the configuration and builds a client over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`RegentError::Config`] if the address is empty or not an
    /// absolute http(s) URL, or if the user agent is empty.
    pub fn build(self) -> Result<Client> {
        let config = self.config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Client::from_parts(config, self.default_name, transport))
    }

    /// Validates the configuration and builds a client over `transport`.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Client<T>> {
        let config = self.config.validate()?;
        Ok(Client::from_parts(config, self.default_name, transport))
    }
}

/// Client for registry API requests.
///
/// A client can be shared between tasks (wrap it in an `Arc`); every
/// [`execute`](Client::execute) call owns its own [`Request`].
#[derive(Debug)]
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    /// Namespace used for `<name>` when a request does not set one
    default_name: RwLock<String>,
    transport: T,
}

impl Client {
    /// Creates a client for `address` with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::Client;
    ///
    /// let client = Client::new("localhost:5000").unwrap();
    /// assert_eq!(client.registry_url(), "http://localhost:5000");
    /// ```
    pub fn new(address: &str) -> Result<Self> {
        Self::builder(address).build()
    }

    /// Starts a [`ClientBuilder`].
    pub fn builder(address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(address)
    }
}

impl<T: Transport> Client<T> {
    fn from_parts(config: ClientConfig, default_name: String, transport: T) -> Self {
        Self {
            config,
            default_name: RwLock::new(default_name),
            transport,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the base registry URL.
    pub fn registry_url(&self) -> &str {
        &self.config.address
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the current default namespace.
    pub fn default_name(&self) -> String {
        self.default_name
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sets the default namespace for requests built from now on.
    ///
    /// Requests already built keep the namespace they were built with.
    pub fn set_default_name(&self, namespace: impl Into<String>) {
        let mut name = self
            .default_name
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *name = namespace.into();
    }

    /// Builds a request from a path template.
    ///
    /// Placeholders are substituted once, here. `<name>` takes the client's
    /// default namespace unless a [`RequestOption::Name`] is given; the other
    /// placeholders are only filled from options. The User-Agent header is
    /// set from the configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::{Client, Method, RequestOption};
    ///
    /// let client = Client::builder("http://localhost:5000")
    ///     .default_name("alpine")
    ///     .build()
    ///     .unwrap();
    /// let req = client.new_request(
    ///     Method::HEAD,
    ///     "/v2/<name>/manifests/<reference>",
    ///     [RequestOption::reference("3.19")],
    /// );
    /// assert_eq!(req.url(), "http://localhost:5000/v2/alpine/manifests/3.19");
    /// ```
    pub fn new_request(
        &self,
        method: Method,
        path: &str,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Request {
        let default_name = self.default_name();
        Request::from_template(
            &self.config.address,
            &default_name,
            &self.config.user_agent,
            method,
            path,
            options,
        )
    }

    /// Sends a request, answering an authentication challenge if needed.
    ///
    /// On `401 Unauthorized` with a `WWW-Authenticate` challenge the request
    /// is replayed once with credentials. The replay's response is returned
    /// even if it is another 401.
    ///
    /// # Errors
    ///
    /// - [`RegentError::InvalidRequest`] if the URL still has a placeholder or
    ///   an empty path segment; nothing is sent
    /// - [`RegentError::Transport`] if the exchange fails on the network
    /// - [`RegentError::AuthFetch`] if the token endpoint cannot be reached or
    ///   answers with something other than JSON
    /// - [`RegentError::UnsupportedAuthScheme`] for a challenge other than
    ///   Bearer or Basic
    /// - [`RegentError::RetryCallback`] if the request's retry callback fails
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let response = transport::dispatch(&self.transport, &request, self.config.debug).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        Negotiator::new(&self.transport, &self.config)
            .negotiate(request, response)
            .await
    }
}
