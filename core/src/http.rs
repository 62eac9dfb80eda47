//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `ApiClient::build_request` produces
//! an `HttpRequest`, a `Transport` (or any host code) executes it, and
//! `ApiClient::parse_response` classifies the resulting `HttpResponse`. The
//! build and parse halves never touch the network, which keeps header and body
//! rules testable without a server.
//!
//! Header names compare case-insensitively everywhere in this crate; the
//! `Vec<(String, String)>` representation preserves caller order and casing.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request body before encoding.
///
/// `Json` is a structured value and is serialized when the resolved content
/// type is JSON. `Raw` is already encoded (multipart, binary uploads) and is
/// sent verbatim without any automatic content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Raw(Vec<u8>),
}

impl RequestBody {
    /// Convert any serializable DTO into a structured body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, RequestBody::Raw(_))
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Raw(bytes)
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as UTF-8 text, for logging and assertions.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE).unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Json(_) => None,
            Payload::Text(text) => Some(text),
        }
    }

    /// Deserialize the payload into a DTO. Text payloads are offered to serde
    /// as a JSON string.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        };
        serde_json::from_value(value).map_err(|e| ApiError::UnexpectedPayload(e.to_string()))
    }
}

pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

pub fn has_header(headers: &[(String, String)], name: &str) -> bool {
    find_header(headers, name).is_some()
}

/// True for `application/json` and `application/*+json`, ignoring parameters.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == APPLICATION_JSON || (essence.starts_with("application/") && essence.ends_with("+json"))
}
