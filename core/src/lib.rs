//! Client core for the email/calendar assistant backend.
//!
//! # Overview
//! Authenticates users, calls the email and calendar endpoints, and decides
//! where navigation may go based on whether a credential is present.
//!
//! # Design
//! - `TokenStore` is an injectable handle over a `CredentialStorage` medium
//!   and broadcasts `AuthChanged` after every update.
//! - `ApiClient` splits each call into `build_request` (sans-IO), one
//!   `Transport::execute` round-trip and `parse_response` (sans-IO). Bearer
//!   injection, JSON body encoding and status classification all live in the
//!   two pure halves.
//! - `guard::evaluate` is a pure decision; `guard::Router` reads the token
//!   store at navigation time and never caches it.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod abort;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod token;
pub mod transport;
pub mod types;

pub use abort::{AbortController, AbortSignal};
pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, DecodePolicy};
pub use error::{ApiError, StorageError, TransportError};
pub use guard::{GuardDecision, Route, RouteMeta, Router};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Payload, RequestBody};
pub use token::{AuthChanged, CredentialStorage, FileStorage, MemoryStorage, TokenStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::*;
