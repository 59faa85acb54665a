//! Domain DTOs for the Etherpad API.
//!
//! # Design
//! Identifiers (group, author, pad, session, read-only ids) stay plain
//! `String`s: they are opaque server-assigned values and the client never
//! interprets them. Only the shapes returned inside `data` get types here.

use serde::Deserialize;
use serde_json::Value;

/// Name of the cookie the pad server reads the session from.
pub const SESSION_COOKIE_NAME: &str = "sessionID";

/// A session as reported by `getSessionInfo` and `listSessionsOf*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "groupID")]
    pub group_id: String,
    #[serde(rename = "authorID")]
    pub author_id: String,
    /// Expiry as epoch seconds.
    #[serde(rename = "validUntil")]
    pub valid_until: i64,
}

/// A user currently connected to a pad.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PadUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Either a palette index or a `#rrggbb` string, depending on the server.
    #[serde(rename = "colorId", default)]
    pub color: Option<Value>,
}

/// Cookie parameters applied to every session a client creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub domain: String,
    pub lifetime_secs: i64,
    /// Set when the server is reached over `https://`.
    pub secure: bool,
}

/// The cookie handed to the host after `createSession` succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// Expiry as epoch seconds; equal to the session's `validUntil`.
    pub expires: i64,
    pub path: String,
    pub domain: String,
    pub secure: bool,
}

impl SessionCookie {
    pub fn new(session_id: String, expires: i64, settings: &SessionSettings) -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            value: session_id,
            expires,
            path: "/".to_string(),
            domain: settings.domain.clone(),
            secure: settings.secure,
        }
    }
}

/// The host's cookie mechanism.
pub trait CookieSink {
    fn set(&self, cookie: &SessionCookie);
}

impl<F> CookieSink for F
where
    F: Fn(&SessionCookie),
{
    fn set(&self, cookie: &SessionCookie) {
        self(cookie)
    }
}
