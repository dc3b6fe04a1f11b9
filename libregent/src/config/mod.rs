//! Client configuration file.
//!
//! A YAML file describes the registry to talk to and how to reach it. Values
//! missing from the file fall back to defaults:
//!
//! ```yaml
//! registry:
//!   address: https://registry.example.com
//!   username: alice
//!   password: secret
//!   default_name: library/alpine
//! network:
//!   timeout: 60
//! ```

use crate::client::{ClientBuilder, DEFAULT_USER_AGENT};
use crate::error::{RegentError, Result};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;


/// Root configuration structure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub registry: Registry,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub network: Network,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            user_agent: default_user_agent(),
            debug: false,
            network: Network::default(),
        }
    }
}

impl Config {
    /// Parses a `Config` from a YAML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use libregent::config::Config;
    ///
    /// let config = Config::from_yaml_str("registry:\n  address: http://localhost:5000\n").unwrap();
    /// assert_eq!(config.registry.address.as_deref(), Some("http://localhost:5000"));
    /// assert_eq!(config.network.timeout, 30);
    /// ```
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(s, FileFormat::Yaml));
        Self::from_builder(builder, None)
    }

    /// Loads a `Config` from an optional file path.
    ///
    /// Without a path, the defaults are returned. A path that does not exist
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults()?;

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder, path)
    }

    /// Starts a client builder from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegentError::Config`] if no registry address is set.
    pub fn client_builder(&self) -> Result<ClientBuilder> {
        let address = self
            .registry
            .address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| RegentError::config("registry.address is required", None))?;

        let mut builder = ClientBuilder::new(address)
            .user_agent(self.user_agent.as_str())
            .debug(self.debug)
            .insecure_skip_tls_verify(self.registry.insecure)
            .timeout(self.network.timeout)
            .max_idle_per_host(self.network.max_idle_per_host)
            .max_redirects(self.network.max_redirects);

        if self.registry.username.is_some() || self.registry.password.is_some() {
            builder = builder.username_password(
                self.registry.username.clone().unwrap_or_default(),
                self.registry.password.clone().unwrap_or_default(),
            );
        }
        if let Some(name) = &self.registry.default_name {
            builder = builder.default_name(name.as_str());
        }
        if let Some(scope) = &self.registry.auth_scope {
            builder = builder.auth_scope(scope.as_str());
        }

        Ok(builder)
    }

    /// Seeds a `config::ConfigBuilder` with the default values.
    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = ConfigRs::try_from(&Config::default()).map_err(|e| {
            RegentError::config_with_source("Failed to encode default configuration", None, e)
        })?;
        Ok(ConfigRs::builder().add_source(defaults))
    }

    /// Creates a `Config` from a `config::ConfigBuilder`.
    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                RegentError::config_with_source(
                    "Failed to deserialize configuration".to_string(),
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })
    }
}

/// Registry connection settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Registry {
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub default_name: Option<String>,

    #[serde(default)]
    pub auth_scope: Option<String>,

    #[serde(default)]
    pub insecure: bool,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Network settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            max_idle_per_host: default_max_idle_per_host(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_max_idle_per_host() -> usize {
    10
}

fn default_max_redirects() -> usize {
    20
}
