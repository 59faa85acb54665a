//! Host configuration consumed by the client.
//!
//! # Design
//! Field names on the wire match the host's configuration keys (`apikey`,
//! `url`, `cookietime`, ...) so a host can hand over its stored settings as
//! JSON unchanged. Every field has a default; validation of the values that
//! matter (API key, base URL, API version) happens during bootstrap, not here.

use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// API version used when the host does not configure one.
pub const DEFAULT_API_VERSION: &str = "1.2";

/// Prefix for the environment variables read by [`ClientConfig::from_env`].
pub const ENV_PREFIX: &str = "ETHERPAD_";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(rename = "apikey")]
    pub api_key: String,

    /// Server base URL, without the `/api` suffix.
    pub url: String,

    #[serde(rename = "apiversion")]
    pub api_version: Option<String>,

    /// Connect timeout in milliseconds. `0` means no timeout.
    #[serde(rename = "connecttimeout")]
    pub connect_timeout_ms: u64,

    /// Overall request timeout in milliseconds. `0` means no timeout.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,

    /// Verify the server's TLS certificate.
    pub check_ssl: bool,

    /// Skip the internal-network block check during bootstrap.
    #[serde(rename = "ignoresecurity")]
    pub ignore_security: bool,

    #[serde(rename = "cookiedomain")]
    pub cookie_domain: String,

    /// Session lifetime in seconds, used for both `validUntil` and the cookie expiry.
    #[serde(rename = "cookietime")]
    pub cookie_lifetime_secs: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: String::new(),
            api_version: None,
            connect_timeout_ms: 300_000,
            timeout_ms: 0,
            check_ssl: true,
            ignore_security: false,
            cookie_domain: String::new(),
            cookie_lifetime_secs: 10_800,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("api_version", &self.api_version)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("check_ssl", &self.check_ssl)
            .field("ignore_security", &self.ignore_security)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_lifetime_secs", &self.cookie_lifetime_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load from `ETHERPAD_*` environment variables. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, using the same variable names as
    /// [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(v) = get("APIKEY") {
            config.api_key = v;
        }
        if let Some(v) = get("URL") {
            config.url = v;
        }
        if let Some(v) = get("APIVERSION") {
            config.api_version = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Some(v) = get("CONNECTTIMEOUT") {
            config.connect_timeout_ms = parse_number("CONNECTTIMEOUT", &v)?;
        }
        if let Some(v) = get("TIMEOUT") {
            config.timeout_ms = parse_number("TIMEOUT", &v)?;
        }
        if let Some(v) = get("CHECK_SSL") {
            config.check_ssl = parse_flag("CHECK_SSL", &v)?;
        }
        if let Some(v) = get("IGNORESECURITY") {
            config.ignore_security = parse_flag("IGNORESECURITY", &v)?;
        }
        if let Some(v) = get("COOKIEDOMAIN") {
            config.cookie_domain = v;
        }
        if let Some(v) = get("COOKIETIME") {
            config.cookie_lifetime_secs = parse_number("COOKIETIME", &v)?;
        }
        Ok(config)
    }

    /// The configured API version, or [`DEFAULT_API_VERSION`].
    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_API_VERSION)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

pub(crate) fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
