//! Blocking HTTP transport backed by `ureq`.

use std::fmt;
use std::time::Duration;

use ureq::tls::TlsConfig;
use ureq::Agent;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Timeouts and TLS verification applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl TransportOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: millis(config.connect_timeout_ms),
            timeout: millis(config.timeout_ms),
            verify_tls: config.check_ssl,
        }
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Default [`Transport`]. HTTP error statuses are returned as data.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    options: TransportOptions,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(options: TransportOptions) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(options.connect_timeout)
            .timeout_global(options.timeout)
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!options.verify_tls)
                    .build(),
            )
            .build()
            .new_agent();
        Self { agent, options }
    }

    pub fn options(&self) -> TransportOptions {
        self.options
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(TransportError::from)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(TransportError::from)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match &err {
            ureq::Error::Timeout(_) => TransportError::Timeout(err.to_string()),
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound | ureq::Error::Io(_) => {
                TransportError::Connection(err.to_string())
            }
            ureq::Error::Tls(_) => TransportError::Tls(err.to_string()),
            _ => TransportError::Other(err.to_string()),
        }
    }
}
