//! Regent - OCI Registry Request Library
//!
//! Regent builds parameterized HTTP requests against OCI distribution
//! endpoints, sends them, and transparently satisfies the registry's
//! token-based authentication challenge when one is raised.
//!
//! # Quick Start
//!
//! ```no_run
//! use libregent::{Client, Method, RequestOption};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder("https://registry.example.com")
//!         .username_password("alice", "secret")
//!         .default_name("library/alpine")
//!         .build()?;
//!
//!     // GET /v2/library/alpine/tags/list
//!     let request = client.new_request(Method::GET, "/v2/<name>/tags/list", []);
//!     let response = client.execute(request).await?;
//!     println!("{}", response.text());
//!
//!     // Start a blob upload and follow the returned location
//!     let request = client.new_request(Method::POST, "/v2/<name>/blobs/uploads/", []);
//!     let response = client.execute(request).await?;
//!     println!("upload at {}", response.relative_location());
//!
//!     // Registry error bodies parse into a list
//!     let request = client.new_request(
//!         Method::GET,
//!         "/v2/<name>/manifests/<reference>",
//!         [RequestOption::reference("does-not-exist")],
//!     );
//!     let response = client.execute(request).await?;
//!     if !response.is_success() {
//!         for error in response.errors()? {
//!             eprintln!("{}", error);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Path Templates
//!
//! Paths may contain `<name>`, `<reference>`, `<digest>` and `<session_id>`.
//! They are filled in when the request is built; a request whose URL still
//! contains one is rejected before anything is sent.
//!
//! # Authentication
//!
//! A `401 Unauthorized` carrying a `WWW-Authenticate` challenge is answered
//! once: Bearer challenges are exchanged for a token at the realm, Basic
//! challenges get the configured username and password. The request is then
//! replayed and the replay's response returned, whatever its status.

#![warn(clippy::all)]

/// Returns the libregent crate version.
///
/// # Examples
///
/// ```
/// let version = libregent::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod path;
pub mod request;
pub mod response;
pub mod transport;

pub use auth::Credentials;
pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::{RegentError, Result};
pub use request::{Request, RequestOption};
pub use http::header::HeaderMap;
pub use http::{Method, StatusCode};
pub use response::{RegistryError, Response};
pub use transport::{HttpTransport, Transport};
