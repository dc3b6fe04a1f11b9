//! Authentication handling for OCI registries.
//!
//! When a registry answers `401 Unauthorized` with a `WWW-Authenticate`
//! challenge, the [`Negotiator`] obtains credentials for it and replays the
//! original request exactly once:
//!
//! - `Bearer` challenges are exchanged for a token at the challenge realm,
//!   presenting the configured username and password as Basic credentials.
//! - `Basic` challenges are answered with the configured username and password.
//!
//! Tokens are never cached; every challenge triggers a fresh exchange.

use crate::client::ClientConfig;
use crate::error::{RegentError, Result};
use crate::request::Request;
use crate::response::Response;
use crate::transport::{self, Transport};
use base64::{Engine as _, engine::general_purpose};
use regex::Regex;
use http::Method;
use http::header::{ACCEPT, AUTHORIZATION, USER_AGENT, WWW_AUTHENTICATE};
use serde::Deserialize;
use std::sync::LazyLock;


/// Finds the auth scheme anywhere in a challenge, case-insensitively.
static SCHEME_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(bearer|basic)").expect("scheme pattern is valid"));

/// Matches `key="value"` challenge parameters.
static PARAM_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_]+)="([^"]*)""#).expect("param pattern is valid"));

/// Credentials for registry authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No credentials configured
    #[default]
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// assert_eq!(creds.username(), "username");
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the configured username, or an empty string.
    pub fn username(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::Basic { username, .. } => username,
        }
    }

    /// Returns the configured password, or an empty string.
    pub fn password(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::Basic { password, .. } => password,
        }
    }

    /// Returns true if no username or password is configured.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns the Basic `Authorization` header value for these credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::auth::Credentials;
    ///
    /// assert_eq!(Credentials::anonymous().to_header_value(), None);
    /// let header = Credentials::basic("user", "pass").to_header_value();
    /// assert_eq!(header.as_deref(), Some("Basic dXNlcjpwYXNz"));
    /// ```
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => Some(basic_header_value(username, password)),
        }
    }
}

/// Formats a Basic `Authorization` header value.
pub fn basic_header_value(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", general_purpose::STANDARD.encode(credentials))
}

/// Formats a Bearer `Authorization` header value.
pub fn bearer_header_value(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Authentication scheme named by a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Bearer,
    Basic,
}

/// Information parsed from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme
    pub scheme: Scheme,

    /// The token endpoint (Bearer) or protection space (Basic)
    pub realm: String,

    /// The service identifier
    pub service: Option<String>,

    /// The scope being requested
    pub scope: Option<String>,
}

impl AuthChallenge {
    /// Parses a WWW-Authenticate header value.
    ///
    /// The scheme is the first `bearer` or `basic` found anywhere in the
    /// header, ignoring case. Parameters are `key="value"` pairs in any
    /// order; when a key repeats, the last value wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::auth::{AuthChallenge, Scheme};
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry",scope="repository:alpine:pull""#;
    /// let challenge = AuthChallenge::parse(header).unwrap();
    /// assert_eq!(challenge.scheme, Scheme::Bearer);
    /// assert_eq!(challenge.realm, "https://auth.example.com/token");
    /// assert_eq!(challenge.scope.as_deref(), Some("repository:alpine:pull"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RegentError::UnsupportedAuthScheme`] if the header names
    /// neither scheme.
    pub fn parse(header: &str) -> Result<Self> {
        let scheme = match SCHEME_MATCHER.find(header) {
            Some(m) if m.as_str().eq_ignore_ascii_case("bearer") => Scheme::Bearer,
            Some(_) => Scheme::Basic,
            None => return Err(RegentError::unsupported_auth_scheme(header)),
        };

        let mut realm = String::new();
        let mut service = None;
        let mut scope = None;

        for caps in PARAM_MATCHER.captures_iter(header) {
            let value = caps[2].to_string();
            match caps[1].to_ascii_lowercase().as_str() {
                "realm" => realm = value,
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {} // Ignore unknown parameters
            }
        }

        Ok(Self {
            scheme,
            realm,
            service,
            scope,
        })
    }
}

/// Body returned by a token endpoint.
///
/// Docker-style endpoints answer with `token`, OAuth2-style ones with
/// `access_token`; some send both.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl TokenResponse {
    /// Returns `token`, falling back to `access_token` when it is missing or
    /// empty. Both missing yields an empty token.
    pub fn into_token(self) -> String {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token)
            .unwrap_or_default()
    }
}

/// Answers a 401 challenge and replays the request once.
pub struct Negotiator<'a, T> {
    transport: &'a T,
    config: &'a ClientConfig,
}

impl<'a, T: Transport> Negotiator<'a, T> {
    pub fn new(transport: &'a T, config: &'a ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Handles an unauthorized `response` to `request`.
    ///
    /// A response without a challenge is returned unchanged. Otherwise the
    /// request gets an `Authorization` header, the retry callback runs, and
    /// the request is sent again. Whatever the replay returns, including
    /// another 401, is the result.
    pub async fn negotiate(&self, mut request: Request, response: Response) -> Result<Response> {
        let header = response
            .header(WWW_AUTHENTICATE.as_str())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        let Some(header) = header else {
            tracing::debug!(url = %request.url(), "401 without challenge, returning response");
            return Ok(response);
        };

        let challenge = AuthChallenge::parse(&header)?;
        tracing::debug!(
            scheme = ?challenge.scheme,
            realm = %challenge.realm,
            service = ?challenge.service,
            scope = ?challenge.scope,
            "received auth challenge"
        );

        match challenge.scheme {
            Scheme::Bearer => {
                let token = self.fetch_token(&challenge).await?;
                request.set_bearer_auth(&token);
            }
            Scheme::Basic => {
                let creds = &self.config.credentials;
                request.set_basic_auth(creds.username(), creds.password());
            }
        }

        request.run_retry_callback()?;

        tracing::debug!(method = %request.method(), url = %request.url(), "replaying request with credentials");
        transport::dispatch(self.transport, &request, self.config.debug).await
    }

    /// Exchanges a bearer challenge for a token at its realm.
    async fn fetch_token(&self, challenge: &AuthChallenge) -> Result<String> {
        url::Url::parse(&challenge.realm).map_err(|e| {
            RegentError::auth_fetch_with_source(
                format!("challenge realm {:?} is not a valid URL", challenge.realm),
                e,
            )
        })?;

        let mut token_request = Request::new(Method::GET, challenge.realm.as_str());
        if let Some(service) = challenge.service.as_deref().filter(|s| !s.is_empty()) {
            token_request.set_query_param("service", service);
        }
        let scope = self
            .config
            .auth_scope
            .as_deref()
            .or(challenge.scope.as_deref())
            .filter(|s| !s.is_empty());
        if let Some(scope) = scope {
            token_request.set_query_param("scope", scope);
        }
        token_request
            .set_header(ACCEPT.as_str(), "application/json")
            .set_header(USER_AGENT.as_str(), &self.config.user_agent);

        if let Some(value) = self.config.credentials.to_header_value() {
            token_request.set_header(AUTHORIZATION.as_str(), &value);
        }

        tracing::debug!(realm = %challenge.realm, "fetching bearer token");
        let response = transport::dispatch(self.transport, &token_request, self.config.debug)
            .await
            .map_err(|e| {
                RegentError::auth_fetch_with_source(
                    format!("token request to {} failed", challenge.realm),
                    e,
                )
            })?;

        // The status is not checked: any JSON body is read for a token, and
        // a rejected exchange shows up as a failed replay.
        let body: TokenResponse = response.json().map_err(|e| {
            RegentError::auth_fetch(
                format!(
                    "token response from {} ({}) is not valid JSON",
                    challenge.realm,
                    response.status()
                ),
                response.status().as_u16(),
                e,
            )
        })?;

        if !response.is_success() {
            tracing::debug!(
                realm = %challenge.realm,
                status = response.status().as_u16(),
                "token endpoint returned non-success status"
            );
        }

        let token = body.into_token();
        if token.is_empty() {
            tracing::debug!(realm = %challenge.realm, "token endpoint returned no token");
        }
        Ok(token)
    }
}
