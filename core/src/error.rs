//! Error types for the Etherpad API client.
//!
//! # Design
//! Construction failures (`BootstrapError`) and per-call failures (`ApiError`)
//! are separate types. A client that failed to bootstrap never exists, so the
//! per-call surface never has to report configuration problems, and a caller
//! holding a client only ever sees transport, envelope, or remote errors.

use thiserror::Error;

use crate::envelope::ResponseCode;

/// Failures raised by a [`Transport`](crate::http::Transport) before any
/// response body is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connect or overall timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// DNS resolution, TCP connect, or socket I/O failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The TLS handshake failed (certificate rejected, protocol mismatch).
    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Errors returned by a single remote API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The server answered 2xx with an empty body.
    #[error("empty response body")]
    EmptyResponse,

    /// The body is not JSON or lacks the `code`/`message` envelope fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The envelope carried a non-zero `code`.
    #[error("remote error {code}: {message}")]
    Remote { code: ResponseCode, message: String },

    /// The envelope was successful but `data` did not have the expected shape.
    #[error("unexpected data returned by {function}: {reason}")]
    UnexpectedData { function: String, reason: String },
}

impl ApiError {
    /// The remote response code, if the server reported the failure itself.
    pub fn remote_code(&self) -> Option<ResponseCode> {
        match self {
            ApiError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors that abort client construction. No client is produced.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The base URL resolves to an address the network security policy blocks.
    #[error("server URL is blocked by the network security policy: {0}")]
    BlockedUrl(String),

    /// The configured API version is not a dotted numeric version.
    #[error("invalid API version '{0}'")]
    InvalidApiVersion(String),

    #[error("API version {configured} is not supported by the server (server version {server})")]
    UnsupportedApiVersion { configured: String, server: String },

    #[error("unable to retrieve the server API version: {0}")]
    UnableToRetrieveVersion(#[source] ApiError),

    #[error("the server rejected the API key")]
    InvalidApiKey(#[source] ApiError),
}

/// Errors raised while loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}
