//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::Cli;
use crate::format::ColorChoice;
use libregent::config::Config;
use std::path::PathBuf;

/// Application context with resolved configuration and runtime state
#[derive(Debug)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    /// Whether output is colored
    pub color: bool,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > CLI flags
    pub fn build(cli: &Cli) -> Result<Self, String> {
        let path = cli.config.clone().or_else(default_config_path_if_exists);
        let mut config = Config::load(path.as_deref()).map_err(|e| e.to_string())?;
        tracing::debug!(path = ?path, "loaded configuration");

        apply_overrides(&mut config, cli, || {
            rpassword::prompt_password("Password: ")
                .map_err(|e| format!("Failed to read password: {}", e))
        })?;

        Ok(Self {
            config,
            color: ColorChoice::from(cli.color.as_str()).enabled(),
        })
    }
}

/// Returns the default config file location (~/.config/regent/config.yaml on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("regent").join("config.yaml"))
}

fn default_config_path_if_exists() -> Option<PathBuf> {
    default_config_path().filter(|p| p.exists())
}

/// Applies CLI flags on top of `config`.
///
/// `prompt` is asked for the password when a username is known but no
/// password is.
pub fn apply_overrides<F>(config: &mut Config, cli: &Cli, prompt: F) -> Result<(), String>
where
    F: FnOnce() -> Result<String, String>,
{
    let registry = &mut config.registry;

    if let Some(address) = &cli.registry {
        registry.address = Some(address.clone());
    }
    if let Some(username) = &cli.username {
        registry.username = Some(username.clone());
    }
    if let Some(password) = &cli.password {
        registry.password = Some(password.clone());
    }
    if let Some(name) = &cli.name {
        registry.default_name = Some(name.clone());
    }
    if let Some(scope) = &cli.auth_scope {
        registry.auth_scope = Some(scope.clone());
    }
    registry.insecure |= cli.insecure;

    if registry.username.is_some() && registry.password.is_none() {
        registry.password = Some(prompt()?);
    }

    if let Some(user_agent) = &cli.user_agent {
        config.user_agent = user_agent.clone();
    }
    config.debug |= cli.debug;

    Ok(())
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
