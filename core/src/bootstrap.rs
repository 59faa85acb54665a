//! Client construction and connection validation.
//!
//! # Design
//! `Bootstrap::connect` runs a fixed sequence of checks and only hands out a
//! [`LiveClient`] once all of them pass:
//!
//! 1. the API key is non-empty (checked before any network I/O);
//! 2. the base URL is a well-formed absolute http(s) URL, normalised to end
//!    in `/api`;
//! 3. the URL is not blocked by the network security policy, unless the host
//!    configuration says to ignore it;
//! 4. the configured API version (default `1.2`) parses;
//! 5. the server's `currentVersion` is at least the configured version;
//! 6. for API versions from 1.2 on, `checkToken` accepts the key.
//!
//! Any failure is terminal and no client is produced.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::api::PadApi;
use crate::client::{LiveClient, RequestBuilder};
use crate::config::ClientConfig;
use crate::error::BootstrapError;
use crate::http::Transport;
use crate::security::{describe_host, SecurityPolicy};
use crate::types::SessionSettings;
use crate::version::ApiVersion;

/// First API version that supports `checkToken`.
pub const TOKEN_CHECK_VERSION: &str = "1.2";

pub struct Bootstrap<'a> {
    config: &'a ClientConfig,
    transport: Arc<dyn Transport>,
    policy: &'a dyn SecurityPolicy,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        config: &'a ClientConfig,
        transport: Arc<dyn Transport>,
        policy: &'a dyn SecurityPolicy,
    ) -> Self {
        Self {
            config,
            transport,
            policy,
        }
    }

    /// Validate the connection to `base_url` with `api_key`. Timeouts, TLS,
    /// API version, and cookie settings come from the host configuration.
    pub fn connect(&self, api_key: &str, base_url: &str) -> Result<LiveClient, BootstrapError> {
        let result = self.run(api_key, base_url);
        if let Err(err) = &result {
            warn!(error = %err, "pad API bootstrap failed");
        }
        result
    }

    fn run(&self, api_key: &str, base_url: &str) -> Result<LiveClient, BootstrapError> {
        if api_key.trim().is_empty() {
            return Err(BootstrapError::MissingApiKey);
        }

        let api_root = normalize_base_url(base_url)?;

        if !self.config.ignore_security && self.policy.is_blocked(&api_root) {
            return Err(BootstrapError::BlockedUrl(describe_host(&api_root)));
        }

        let configured = self.config.api_version();
        let api_version: ApiVersion = configured
            .parse()
            .map_err(|_| BootstrapError::InvalidApiVersion(configured.to_string()))?;

        let client = LiveClient::new(
            RequestBuilder::new(api_root.as_str(), api_version.clone(), api_key),
            Arc::clone(&self.transport),
            SessionSettings {
                domain: self.config.cookie_domain.clone(),
                lifetime_secs: self.config.cookie_lifetime_secs,
                secure: api_root.scheme() == "https",
            },
        );

        let server = client
            .get_version()
            .map_err(BootstrapError::UnableToRetrieveVersion)?;
        let server_version: ApiVersion = server.parse().map_err(|_| {
            BootstrapError::UnsupportedApiVersion {
                configured: api_version.to_string(),
                server: server.clone(),
            }
        })?;
        if server_version < api_version {
            return Err(BootstrapError::UnsupportedApiVersion {
                configured: api_version.to_string(),
                server,
            });
        }

        if requires_token_check(&api_version) {
            client.check_token().map_err(BootstrapError::InvalidApiKey)?;
        }

        info!(api_root = %api_root, api_version = %api_version, server_version = %server_version, "connected to pad API");
        Ok(client)
    }
}

fn requires_token_check(version: &ApiVersion) -> bool {
    TOKEN_CHECK_VERSION
        .parse::<ApiVersion>()
        .map(|threshold| *version >= threshold)
        .unwrap_or(true)
}

/// Trim trailing slashes, append `/api`, and require an absolute http(s) URL
/// with a host.
pub fn normalize_base_url(base_url: &str) -> Result<Url, BootstrapError> {
    let invalid = |reason: String| BootstrapError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("empty URL".to_string()));
    }
    let url = Url::parse(&format!("{trimmed}/api")).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed".to_string()));
    }
    Ok(url)
}
