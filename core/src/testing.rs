//! In-memory transport and helpers shared by the unit tests.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::envelope::Params;
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Transport};

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport answering every request with a closure and recording what was sent.
pub(crate) struct FakeTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport").finish_non_exhaustive()
    }
}

impl FakeTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A well-behaved server: answers the version probe with
    /// `server_version` and every call with a success envelope from `data`.
    pub(crate) fn server<F>(server_version: &'static str, data: F) -> Arc<Self>
    where
        F: Fn(&str, &Params) -> Value + Send + Sync + 'static,
    {
        Self::new(move |req| {
            if !req.url.contains("apikey") && req.body.is_none() {
                return Ok(ok(&json!({ "currentVersion": server_version }).to_string()));
            }
            Ok(ok(&envelope(0, data(function_of(req), &params_of(req)))))
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub(crate) fn ok(body: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: Vec::new(),
        body: body.to_string(),
    }
}

pub(crate) fn envelope(code: i64, data: Value) -> String {
    let message = if code == 0 { "ok" } else { "failed" };
    json!({ "code": code, "message": message, "data": data }).to_string()
}

/// Last path segment of the request URL, i.e. the API function name.
pub(crate) fn function_of(req: &HttpRequest) -> &str {
    let path = req.url.split('?').next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default()
}

/// Decoded parameters from the query string (GET) or form body (POST).
pub(crate) fn params_of(req: &HttpRequest) -> Params {
    let raw = match &req.body {
        Some(body) => body.as_str(),
        None => req.url.split_once('?').map(|(_, q)| q).unwrap_or_default(),
    };
    url::form_urlencoded::parse(raw.as_bytes()).fold(Params::new(), |params, (k, v)| {
        params.with(&k, v.into_owned())
    })
}
