//! Error types for the API client.
//!
//! # Design
//! Transport failures pass through untouched (`#[error(transparent)]`) so the
//! caller sees exactly what the HTTP stack reported. Non-2xx responses always
//! become `Http` with the status, a display message and the classified body.
//! Credential storage failures never reach this enum; `TokenStore` absorbs
//! them.

use thiserror::Error;

use crate::http::Payload;

/// Boxed error produced by a `Transport` implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// DNS, connect, TLS or body-read failure inside the transport.
    #[error(transparent)]
    Transport(TransportError),

    /// The caller's abort signal fired before the response arrived.
    #[error("request aborted")]
    Aborted,

    /// The server answered outside the 2xx range.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: Payload,
    },

    /// A JSON response body failed to parse under `DecodePolicy::Strict`.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),

    /// The response parsed, but not into the shape the endpoint promises.
    #[error("unexpected response payload: {0}")]
    UnexpectedPayload(String),
}

impl ApiError {
    /// Status code for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Network-level failures, including caller-initiated aborts.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Aborted)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Errors raised by a `CredentialStorage` medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential storage unavailable: {0}")]
    Unavailable(String),
}
