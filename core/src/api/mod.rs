//! Typed endpoint wrappers layered on `ApiClient::request`.
//!
//! Each submodule adds an `impl` block to `ApiClient`; none of them carries
//! its own error handling beyond mapping payloads onto DTOs.

mod auth;
mod calendar;
mod emails;

pub const AUTH_PREFIX: &str = "/api/v1/auth";
pub const USERS_PREFIX: &str = "/api/v1/users";
pub const EMAILS_PREFIX: &str = "/api/v1/emails";
pub const CALENDAR_PREFIX: &str = "/api/v1/calendar-events";
