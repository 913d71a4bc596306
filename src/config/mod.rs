//! Configuration management

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::DEFAULT_URL;

/// Client name shown in the player's "connected apps" list
pub const DEFAULT_CLIENT_NAME: &str = "Applescript Invoker";

/// Legacy variable holding the credential printed by `gpmdp auth`
pub const AUTH_KEY_ENV: &str = "GPMDP_AUTH_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Player websocket endpoint
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Credential from a previous `auth` run
    #[serde(default)]
    pub auth_key: Option<String>,

    /// How long `status` waits for the full initial state
    #[serde(default = "default_status_grace_ms")]
    pub status_grace_ms: u64,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_status_grace_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            client_name: default_client_name(),
            auth_key: None,
            status_grace_ms: default_status_grace_ms(),
        }
    }
}

impl Config {
    /// The stored credential, if one is set and non-empty
    pub fn stored_credential(&self) -> Option<&str> {
        self.auth_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn status_grace(&self) -> Duration {
        Duration::from_millis(self.status_grace_ms)
    }
}

/// Get config directory (XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GPMDP_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/gpmdp-remote");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("gpmdp-remote");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config/gpmdp-remote");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("gpmdp-remote");
        }
    }

    // Fallback to current directory
    PathBuf::from(".")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        .set_default("url", DEFAULT_URL)?
        .set_default("client_name", DEFAULT_CLIENT_NAME)?
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (GPMDP_URL, GPMDP_CLIENT_NAME, ...)
        .add_source(::config::Environment::with_prefix("GPMDP").try_parsing(true));

    // The credential is always a string, even when it happens to look numeric
    if let Ok(key) = std::env::var(AUTH_KEY_ENV) {
        builder = builder.set_override("auth_key", key)?;
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}
