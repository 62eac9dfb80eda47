//! Authenticated request pipeline.
//!
//! # Design
//! `ApiClient` owns its configuration, a `TokenStore` handle and a
//! `Transport`. Every call is split into a sans-IO `build_request`, a single
//! transport round-trip and a sans-IO `parse_response`, so the header and body
//! rules are testable without a server and any host can run the I/O itself.
//!
//! The bearer token is read once while building the request. A token rotated
//! after that point does not affect requests already dispatched.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::abort::AbortSignal;
use crate::config::{ClientConfig, DecodePolicy};
use crate::error::ApiError;
use crate::http::{
    has_header, is_json_content_type, HttpMethod, HttpRequest, HttpResponse, Payload, RequestBody,
    APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE,
};
use crate::token::TokenStore;
use crate::transport::{ReqwestTransport, Transport};

const FALLBACK_MESSAGE: &str = "request failed";

/// Everything about one call except its path.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<RequestBody>,
    /// Caller headers win over anything the pipeline would add.
    pub headers: Vec<(String, String)>,
    pub signal: Option<AbortSignal>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

pub struct ApiClient<T = ReqwestTransport> {
    config: ClientConfig,
    tokens: TokenStore,
    transport: T,
}

impl ApiClient<ReqwestTransport> {
    /// Client over `reqwest` with the token store the config describes.
    pub fn from_config(config: ClientConfig) -> Self {
        let tokens = TokenStore::from_config(&config);
        Self::new(config, tokens, ReqwestTransport::new())
    }
}

impl<T> ApiClient<T> {
    pub fn new(config: ClientConfig, tokens: TokenStore, transport: T) -> Self {
        Self {
            config,
            tokens,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute `http(s)://` paths pass through; anything else is joined to
    /// the base URL.
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') || path.is_empty() {
            format!("{}{path}", self.config.base_url)
        } else {
            format!("{}/{path}", self.config.base_url)
        }
    }

    /// Turn a request descriptor into wire-ready data. The abort signal in
    /// `options` is ignored here.
    pub fn build_request(&self, path: &str, options: RequestOptions) -> Result<HttpRequest, ApiError> {
        let RequestOptions {
            method,
            body,
            mut headers,
            ..
        } = options;

        if let Some(body) = &body {
            if !body.is_raw() && !has_header(&headers, CONTENT_TYPE) {
                headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
            }
        }

        let token = self.tokens.get_token();
        if !token.is_empty() && !has_header(&headers, AUTHORIZATION) {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }

        let json_body = crate::http::find_header(&headers, CONTENT_TYPE)
            .map(is_json_content_type)
            .unwrap_or(false);
        let body = body.map(|body| encode_body(body, json_body)).transpose()?;

        Ok(HttpRequest {
            method,
            url: self.resolve_url(path),
            headers,
            body,
        })
    }

    /// Classify a response body and map non-2xx statuses to `ApiError::Http`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Payload, ApiError> {
        let success = response.is_success();
        let json = is_json_content_type(response.content_type());

        let payload = if json {
            match decode_json(&response.body) {
                Ok(value) => Payload::Json(value),
                Err(e) => match self.config.decode_policy {
                    DecodePolicy::Lenient => {
                        warn!(status = response.status, error = %e, "malformed JSON body replaced with empty object");
                        Payload::Json(Value::Object(Map::new()))
                    }
                    // A failure status still reports as Http, with the raw body.
                    DecodePolicy::Strict if !success => {
                        debug!(status = response.status, error = %e, "undecodable error body kept as text");
                        Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
                    }
                    DecodePolicy::Strict => return Err(ApiError::Decode(e.to_string())),
                },
            }
        } else {
            Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
        };

        if !success {
            return Err(ApiError::Http {
                status: response.status,
                message: failure_message(&payload),
                body: payload,
            });
        }
        Ok(payload)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Build, dispatch and classify one request.
    pub async fn request(&self, path: &str, mut options: RequestOptions) -> Result<Payload, ApiError> {
        let signal = options.signal.take();
        let request = self.build_request(path, options)?;
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let response = match signal {
            Some(signal) if signal.is_aborted() => return Err(ApiError::Aborted),
            Some(mut signal) => {
                tokio::select! {
                    result = self.transport.execute(request) => result,
                    () = signal.aborted() => return Err(ApiError::Aborted),
                }
            }
            None => self.transport.execute(request).await,
        }
        .map_err(ApiError::Transport)?;

        debug!(status = response.status, "response received");
        self.parse_response(response)
    }

    /// `GET` with a query string built from flat key/value pairs.
    pub async fn get<I, K, V>(&self, path: &str, params: I) -> Result<Payload, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        self.get_with(path, params, RequestOptions::default()).await
    }

    pub async fn get_with<I, K, V>(
        &self,
        path: &str,
        params: I,
        options: RequestOptions,
    ) -> Result<Payload, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let path = with_query(path, params);
        self.request(
            &path,
            RequestOptions {
                method: HttpMethod::Get,
                ..options
            },
        )
        .await
    }

    pub async fn post(&self, path: &str, body: Option<RequestBody>) -> Result<Payload, ApiError> {
        self.send(HttpMethod::Post, path, body, RequestOptions::default()).await
    }

    pub async fn put(&self, path: &str, body: Option<RequestBody>) -> Result<Payload, ApiError> {
        self.send(HttpMethod::Put, path, body, RequestOptions::default()).await
    }

    pub async fn patch(&self, path: &str, body: Option<RequestBody>) -> Result<Payload, ApiError> {
        self.send(HttpMethod::Patch, path, body, RequestOptions::default()).await
    }

    pub async fn delete(&self, path: &str, body: Option<RequestBody>) -> Result<Payload, ApiError> {
        self.send(HttpMethod::Delete, path, body, RequestOptions::default()).await
    }

    /// Shared body for the method conveniences; `options.method` and
    /// `options.body` are replaced.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload, ApiError> {
        self.request(
            path,
            RequestOptions {
                method,
                body,
                ..options
            },
        )
        .await
    }
}

/// Append `params` as a percent-encoded query string.
pub fn with_query<I, K, V>(path: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: ToString,
{
    let query = params
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key.as_ref()),
                urlencoding::encode(&value.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        return path.to_string();
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{query}")
}

fn encode_body(body: RequestBody, as_json: bool) -> Result<Vec<u8>, ApiError> {
    match body {
        RequestBody::Raw(bytes) => Ok(bytes),
        RequestBody::Json(value) if as_json => {
            serde_json::to_vec(&value).map_err(|e| ApiError::Serialization(e.to_string()))
        }
        RequestBody::Json(Value::String(text)) => Ok(text.into_bytes()),
        RequestBody::Json(value) => Ok(value.to_string().into_bytes()),
    }
}

fn decode_json(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(bytes)
}

fn failure_message(payload: &Payload) -> String {
    match payload {
        Payload::Json(value) => ["message", "detail"]
            .iter()
            .find_map(|key| {
                value
                    .get(*key)
                    .and_then(Value::as_str)
                    .filter(|message| !message.is_empty())
            })
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string(),
        Payload::Text(text) if !text.is_empty() => text.clone(),
        Payload::Text(_) => FALLBACK_MESSAGE.to_string(),
    }
}
