//! Server-side client for the Etherpad HTTP API.
//!
//! # Overview
//! Authenticates with an API key, issues versioned GET/POST calls for pad,
//! group, author, and session management, and decodes the
//! `{code, message, data}` response envelope into typed results.
//!
//! # Design
//! - `RequestBuilder` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network; a `Transport` performs the I/O
//!   (`UreqTransport` by default).
//! - `PadApi` exposes one typed method per remote function on top of a single
//!   `call`. `LiveClient` and the no-I/O `StubClient` both implement it.
//! - `Bootstrap` validates the URL, network policy, API version, and key
//!   before a `LiveClient` exists; `ClientFactory` runs it once and hands
//!   out the same client afterwards.
//! - `LegacyClient` degrades errors to `false`/`None` for callers that rely
//!   on that convention.
//! - `is_url_blocked` checks a candidate server URL against the internal
//!   network policy without needing a client.

pub mod api;
pub mod bootstrap;
pub mod client;
pub mod compat;
pub mod config;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod http;
pub mod security;
pub mod transport;
pub mod types;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use api::PadApi;
pub use bootstrap::Bootstrap;
pub use client::{LiveClient, RequestBuilder};
pub use compat::LegacyClient;
pub use config::ClientConfig;
pub use envelope::{decode, encode_params, Envelope, Params, ResponseCode};
pub use error::{ApiError, BootstrapError, ConfigError, TransportError};
pub use factory::{ClientFactory, EnvTestDetector, PadClient, StubClient, TestDetector};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use security::{is_url_blocked, is_url_blocked_with, PrivateNetworkPolicy, SecurityPolicy};
pub use transport::{TransportOptions, UreqTransport};
pub use types::{CookieSink, PadUser, SessionCookie, SessionInfo, SessionSettings};
pub use version::{check_version, ApiVersion};
