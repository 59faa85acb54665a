//! Request building and the network-backed client.
//!
//! # Design
//! `RequestBuilder` is stateless apart from the API root, version, and key. It
//! turns a function name plus parameters into an `HttpRequest` and turns an
//! `HttpResponse` back into the envelope's `data`, without touching the
//! network. `LiveClient` pairs it with a [`Transport`] to perform the
//! round-trip; this is the only place where I/O happens per call.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::PadApi;
use crate::envelope::{decode, encode_params, form_encode, Params};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::SessionSettings;
use crate::version::ApiVersion;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builds versioned endpoint requests and parses their responses.
#[derive(Clone)]
pub struct RequestBuilder {
    api_root: String,
    api_version: ApiVersion,
    api_key: String,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("api_root", &self.api_root)
            .field("api_version", &self.api_version.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl RequestBuilder {
    /// `api_root` is the server URL including the `/api` suffix.
    pub fn new(api_root: &str, api_version: ApiVersion, api_key: &str) -> Self {
        Self {
            api_root: api_root.trim_end_matches('/').to_string(),
            api_version,
            api_key: api_key.to_string(),
        }
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// `{api_root}/{version}/{function}`
    pub fn endpoint(&self, function: &str) -> String {
        format!("{}/{}/{function}", self.api_root, self.api_version)
    }

    /// Build an authenticated call. GET carries the parameters in the query
    /// string, POST as a form body.
    pub fn build_call(&self, function: &str, params: Params, method: HttpMethod) -> HttpRequest {
        let encoded = form_encode(&encode_params(params, &self.api_key));
        let endpoint = self.endpoint(function);
        match method {
            HttpMethod::Get => HttpRequest {
                method,
                url: format!("{endpoint}?{encoded}"),
                headers: Vec::new(),
                body: None,
            },
            HttpMethod::Post => HttpRequest {
                method,
                url: endpoint,
                headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                body: Some(encoded),
            },
        }
    }

    /// Build the unauthenticated probe for the server's current API version.
    pub fn build_version_probe(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.api_root.clone(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_call(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    /// Extract `currentVersion` from the probe response.
    pub fn parse_version(&self, response: HttpResponse) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct VersionProbe {
            #[serde(rename = "currentVersion")]
            current_version: String,
        }

        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Err(ApiError::EmptyResponse);
        }
        serde_json::from_str::<VersionProbe>(&response.body)
            .map(|probe| probe.current_version)
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Client that talks to a real server through a [`Transport`].
///
/// Only produced by [`Bootstrap`](crate::bootstrap::Bootstrap) after the
/// server version and API key have been validated.
#[derive(Debug, Clone)]
pub struct LiveClient {
    requests: RequestBuilder,
    transport: Arc<dyn Transport>,
    session: SessionSettings,
}

impl LiveClient {
    pub(crate) fn new(
        requests: RequestBuilder,
        transport: Arc<dyn Transport>,
        session: SessionSettings,
    ) -> Self {
        Self {
            requests,
            transport,
            session,
        }
    }

    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    /// Ask the server for its current API version. Unauthenticated.
    pub fn get_version(&self) -> Result<String, ApiError> {
        let request = self.requests.build_version_probe();
        debug!(url = %request.url, "probing server API version");
        let response = self.transport.execute(&request)?;
        self.requests.parse_version(response)
    }
}

impl PadApi for LiveClient {
    fn call(&self, function: &str, params: Params, method: HttpMethod) -> Result<Value, ApiError> {
        let request = self.requests.build_call(function, params, method);
        debug!(function, %method, "calling pad API");
        let result = self
            .transport
            .execute(&request)
            .map_err(ApiError::from)
            .and_then(|response| self.requests.parse_call(response));
        if let Err(err) = &result {
            warn!(function, error = %err, "pad API call failed");
        }
        result
    }

    fn session_settings(&self) -> &SessionSettings {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::testing::{envelope, function_of, ok, params_of, FakeTransport};

    fn builder() -> RequestBuilder {
        RequestBuilder::new("http://pad.local/api", "1.2.13".parse().unwrap(), "secret")
    }

    fn session() -> SessionSettings {
        SessionSettings {
            domain: String::new(),
            lifetime_secs: 60,
            secure: false,
        }
    }

    #[test]
    fn endpoint_includes_version_and_function() {
        assert_eq!(builder().endpoint("createGroup"), "http://pad.local/api/1.2.13/createGroup");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let b = RequestBuilder::new("http://pad.local/api/", "1.2".parse().unwrap(), "k");
        assert_eq!(b.endpoint("checkToken"), "http://pad.local/api/1.2/checkToken");
    }

    #[test]
    fn get_puts_params_in_query_string() {
        let req = builder().build_call("getText", Params::new().with("padID", "p 1"), HttpMethod::Get);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://pad.local/api/1.2.13/getText?padID=p+1&apikey=secret");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn post_puts_params_in_form_body() {
        let req = builder().build_call("setText", Params::new().with("padID", "p").with("text", "hi"), HttpMethod::Post);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://pad.local/api/1.2.13/setText");
        assert_eq!(req.body.as_deref(), Some("padID=p&text=hi&apikey=secret"));
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())]
        );
    }

    #[test]
    fn version_probe_is_unauthenticated() {
        let req = builder().build_version_probe();
        assert_eq!(req.url, "http://pad.local/api");
        assert!(!req.url.contains("apikey"));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let b = builder();
        assert!(!format!("{b:?}").contains("secret"));
        let req = b.build_call("checkToken", Params::new(), HttpMethod::Get);
        assert!(!format!("{req:?}").contains("secret"));
    }

    #[test]
    fn parse_version_reads_current_version() {
        let version = builder().parse_version(ok(r#"{"currentVersion":"1.2.13"}"#)).unwrap();
        assert_eq!(version, "1.2.13");
    }

    #[test]
    fn parse_version_rejects_non_json() {
        let err = builder().parse_version(ok("Etherpad is running")).unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn parse_call_rejects_http_errors() {
        let response = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: "bad gateway".to_string(),
        };
        let err = builder().parse_call(response).unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 502, .. }));
    }

    #[test]
    fn call_injects_api_key_and_decodes_data() {
        let transport = FakeTransport::new(|_| Ok(ok(&envelope(0, json!({"groupID": "g.1"})))));
        let client = LiveClient::new(builder(), transport.clone(), session());

        let data = client.call("createGroup", Params::new(), HttpMethod::Post).unwrap();
        assert_eq!(data, json!({"groupID": "g.1"}));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(function_of(&sent[0]), "createGroup");
        assert_eq!(params_of(&sent[0]).get("apikey"), Some("secret"));
    }

    #[test]
    fn call_surfaces_transport_failures() {
        let transport = FakeTransport::new(|_| Err(TransportError::Timeout("30s".to_string())));
        let client = LiveClient::new(builder(), transport, session());

        let err = client.call("checkToken", Params::new(), HttpMethod::Get).unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Timeout(_))));
    }

    #[test]
    fn get_version_uses_probe_endpoint() {
        let transport = FakeTransport::new(|req| {
            assert_eq!(req.url, "http://pad.local/api");
            Ok(ok(r#"{"currentVersion":"1.3.0"}"#))
        });
        let client = LiveClient::new(builder(), transport, session());
        assert_eq!(client.get_version().unwrap(), "1.3.0");
    }
}
