//! Error types for regent
//!
//! Every fallible operation in the crate returns [`RegentError`]. Variants map
//! one-to-one onto the failure kinds a caller needs to tell apart: bad client
//! configuration, a request that must not be sent, a transport failure, a
//! failed token exchange, and so on.

use thiserror::Error;


/// Boxed error type accepted from caller-supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for regent operations
#[derive(Error, Debug)]
pub enum RegentError {
    /// Client configuration is invalid (base address, user agent, config file)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    /// Request cannot be dispatched (unresolved placeholder, malformed path,
    /// bad header). Never reaches the network.
    #[error("Invalid request to {url}: {message}")]
    InvalidRequest { message: String, url: String },

    /// Network-level failure reported by the transport (connection, TLS, DNS, timeout)
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The round trip to the token realm failed
    #[error("Failed to fetch auth token (status: {status_code:?}): {message}")]
    AuthFetch {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<BoxError>,
    },

    /// The challenge named a scheme other than Bearer or Basic
    #[error("Unsupported authentication scheme in challenge: {challenge}")]
    UnsupportedAuthScheme { challenge: String },

    /// The caller's pre-replay hook failed; the replay was not sent
    #[error("Retry callback failed: {source}")]
    RetryCallback {
        #[source]
        source: BoxError,
    },

    /// The response body is not a registry error list
    #[error("Malformed registry error body: {source}")]
    MalformedErrorBody {
        #[source]
        source: serde_json::Error,
    },

    /// Authentication errors (401, 403) raised by `Response::check_status`
    #[error("Authentication error (status: {status_code}): {message}")]
    Authentication { message: String, status_code: u16 },

    /// Resource not found (404)
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// Rate limiting (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (5xx)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Any other non-success status
    #[error("Unexpected status {status_code}: {message}")]
    UnexpectedStatus { message: String, status_code: u16 },
}

/// Result type alias for regent operations
pub type Result<T> = std::result::Result<T, RegentError>;

impl RegentError {
    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::error::RegentError;
    ///
    /// let err = RegentError::config("address is required", None);
    /// assert!(matches!(err, RegentError::Config { .. }));
    /// ```
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::error::RegentError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    /// let err = RegentError::config_with_source("failed to read config", Some("/etc/regent.yaml"), io_err);
    /// assert!(matches!(err, RegentError::Config { .. }));
    /// ```
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid request error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::error::RegentError;
    ///
    /// let err = RegentError::invalid_request("unresolved placeholder", "http://r/v2/<name>/tags/list");
    /// assert!(matches!(err, RegentError::InvalidRequest { .. }));
    /// ```
    pub fn invalid_request<M: Into<String>, U: Into<String>>(message: M, url: U) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            url: url.into(),
        }
    }

    /// Creates a new transport error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new transport error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::error::RegentError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
    /// let err = RegentError::transport_with_source("failed to connect", io_err);
    /// assert!(matches!(err, RegentError::Transport { .. }));
    /// ```
    pub fn transport_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a token fetch error for a response that could not be read,
    /// keeping the status the token endpoint answered with.
    pub fn auth_fetch<S, E>(message: S, status_code: u16, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::AuthFetch {
            message: message.into(),
            status_code: Some(status_code),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps any error raised while talking to the token realm.
    ///
    /// A transport failure keeps its message so the caller still sees what
    /// went wrong on the wire.
    pub fn auth_fetch_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::AuthFetch {
            message: message.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new unsupported scheme error.
    pub fn unsupported_auth_scheme<S: Into<String>>(challenge: S) -> Self {
        Self::UnsupportedAuthScheme {
            challenge: challenge.into(),
        }
    }

    /// Wraps an error returned by a retry callback.
    pub fn retry_callback(source: BoxError) -> Self {
        Self::RetryCallback { source }
    }

    /// Returns true if the error was raised before any network call was made.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::error::RegentError;
    ///
    /// assert!(RegentError::invalid_request("bad", "http://r//x").is_pre_dispatch());
    /// assert!(!RegentError::transport("refused").is_pre_dispatch());
    /// ```
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidRequest { .. })
    }
}
