//! Domain DTOs for the assistant backend.
//!
//! # Design
//! These mirror the backend's response models but are defined independently
//! of the mock-server crate; integration tests catch schema drift between the
//! two. Timestamps stay as the server's ISO-8601 strings.

use serde::{Deserialize, Serialize};

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Login/register response. `access_token` is the credential the client
/// stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    pub user_id: i64,
    pub email: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthUrl {
    pub auth_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    #[serde(default)]
    pub google_sub: Option<String>,
}

/// Pagination accepted by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub skip: u32,
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

impl ListParams {
    pub fn to_query(self) -> [(&'static str, u32); 2] {
        [("skip", self.skip), ("limit", self.limit)]
    }
}

/// A mailbox message the backend has ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Email {
    pub id: i64,
    pub user_id: i64,
    pub email_id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub received_at: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessEmailsRequest {
    pub max_results: u32,
}

impl Default for ProcessEmailsRequest {
    fn default() -> Self {
        Self { max_results: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessSummary {
    pub success: bool,
    pub processed_count: u32,
    pub created_events_count: u32,
    pub message: String,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Brief for `POST /emails/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateEmailRequest {
    pub brief_content: String,
    /// professional, friendly, formal or casual.
    pub tone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedEmail {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub body_html: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateEmailResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<GeneratedEmail>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
}

/// An AI-derived event waiting for confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: i64,
    pub user_id: i64,
    pub summary: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    /// Comma-separated addresses.
    #[serde(default)]
    pub attendees: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub user_id: i64,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<String>,
}

/// Partial update; omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarEventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub calendar_event_id: Option<i64>,
    #[serde(default)]
    pub google_event_id: Option<String>,
}
