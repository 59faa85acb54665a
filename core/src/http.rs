//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The request builder produces
//! `HttpRequest` values and the envelope codec consumes `HttpResponse` values
//! without touching the network; a [`Transport`] implementation performs the
//! actual round-trip. The host may supply its own transport (for example one
//! that routes through an outbound proxy) or use
//! [`UreqTransport`](crate::transport::UreqTransport).

use std::fmt;

use crate::error::TransportError;

/// HTTP method for a request. The remote API accepts only GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// An HTTP request described as plain data.
///
/// For GET requests the parameters are already encoded into `url`; for POST
/// requests they are the form-encoded `body`.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

// The url and body both carry the API key, so only the path is printed.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.url.split('?').next().unwrap_or_default();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &path)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<form>"))
            .finish()
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one `HttpRequest` against the network.
///
/// Implementations must return non-2xx responses as `Ok` data; only failures
/// that prevent a response from being read are `Err`.
pub trait Transport: fmt::Debug + Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
