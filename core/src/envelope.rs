//! Request parameter encoding and response envelope decoding.
//!
//! Every API response is wrapped as `{"code": <int>, "message": <string>,
//! "data": <any>}`. `code` and `message` are mandatory; a missing `data` is
//! read as `null`.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Name of the parameter carrying the API key on every authenticated call.
pub const API_KEY_PARAM: &str = "apikey";

/// The `code` field of a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    InvalidParameters,
    InternalError,
    InvalidFunction,
    InvalidApiKey,
    Unknown(i64),
}

impl From<i64> for ResponseCode {
    fn from(code: i64) -> Self {
        match code {
            0 => ResponseCode::Ok,
            1 => ResponseCode::InvalidParameters,
            2 => ResponseCode::InternalError,
            3 => ResponseCode::InvalidFunction,
            4 => ResponseCode::InvalidApiKey,
            other => ResponseCode::Unknown(other),
        }
    }
}

impl ResponseCode {
    pub fn as_i64(self) -> i64 {
        match self {
            ResponseCode::Ok => 0,
            ResponseCode::InvalidParameters => 1,
            ResponseCode::InternalError => 2,
            ResponseCode::InvalidFunction => 3,
            ResponseCode::InvalidApiKey => 4,
            ResponseCode::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::Ok => "ok",
            ResponseCode::InvalidParameters => "invalid parameters",
            ResponseCode::InternalError => "internal error",
            ResponseCode::InvalidFunction => "invalid function",
            ResponseCode::InvalidApiKey => "invalid API key",
            ResponseCode::Unknown(_) => "unknown",
        };
        write!(f, "{} ({name})", self.as_i64())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from(self.code)
    }

    pub fn into_result(self) -> Result<Value, ApiError> {
        match self.response_code() {
            ResponseCode::Ok => Ok(self.data),
            code => Err(ApiError::Remote {
                code,
                message: self.message,
            }),
        }
    }
}

/// Ordered request parameters. Optional parameters are only added when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.push((name.to_string(), value.into()));
        self
    }

    pub fn with_opt<V: Into<String>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Add the API key to a call's parameters.
pub fn encode_params(params: Params, api_key: &str) -> Params {
    params.with(API_KEY_PARAM, api_key)
}

/// Render parameters as `application/x-www-form-urlencoded` text.
pub fn form_encode(params: &Params) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Decode a response body into the envelope's `data` on success.
pub fn decode(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::EmptyResponse);
    }
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
    envelope.into_result()
}
