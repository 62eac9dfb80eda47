//! In-memory stand-in for the assistant backend.
//!
//! Speaks the same contract as the real service: bearer-token auth on every
//! user-scoped route, `{"detail": ...}` error bodies, 201 on creation and 204
//! on logout. "Processing" mail ingests canned messages and derives one
//! calendar event from each, which is enough to drive the client end to end.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

const TIMESTAMP: &str = "2025-11-10T09:00:00";

#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Email {
    pub id: i64,
    pub user_id: i64,
    pub email_id: String,
    pub thread_id: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub subject: Option<String>,
    pub received_at: Option<String>,
    pub snippet: Option<String>,
    pub body_text: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub user_id: i64,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub attendees: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i64,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Deserialize)]
pub struct OAuthQuery {
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub struct ProcessInput {
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    10
}

#[derive(Deserialize)]
pub struct GenerateInput {
    pub brief_content: String,
    pub tone: String,
    pub subject: Option<String>,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SendInput {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct NewEvent {
    pub user_id: i64,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub attendees: Option<String>,
}

#[derive(Deserialize)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub attendees: Option<String>,
}

/// Canned unread mail: (from, subject, snippet, event start, event end, location).
const INBOX_FIXTURES: &[(&str, &str, &str, &str, &str, &str)] = &[
    (
        "shen.haitong@example.com",
        "LLM integration sync",
        "Can we meet on Zoom to discuss the LLM integration?",
        "2025-11-12T14:00:00",
        "2025-11-12T15:00:00",
        "Zoom",
    ),
    (
        "xu.ziyi@example.com",
        "UI component library",
        "Let's sync on the UI component library in the lab.",
        "2025-11-13T10:30:00",
        "2025-11-13T11:30:00",
        "COMP7607 Lab",
    ),
    (
        "advisor@example.com",
        "Project review",
        "Please come by for the mid-term project review.",
        "2025-11-14T16:00:00",
        "2025-11-14T17:00:00",
        "Room 301",
    ),
];

#[derive(Default)]
pub struct Store {
    next_id: i64,
    users: HashMap<String, User>,
    sessions: HashMap<String, i64>,
    emails: BTreeMap<i64, Email>,
    events: BTreeMap<i64, CalendarEvent>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user_id);
        token
    }

    fn user_by_id(&self, id: i64) -> Option<&User> {
        self.users.values().find(|u| u.id == id)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response in the backend's `{"detail": ...}` shape.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    detail: String,
}

impl Failure {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn authenticate(store: &Store, headers: &HeaderMap) -> Result<i64, Failure> {
    bearer_token(headers)
        .and_then(|token| store.sessions.get(token).copied())
        .ok_or_else(|| Failure::new(StatusCode::UNAUTHORIZED, "Not authenticated"))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/v1/health/", get(health))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/google/url", get(google_url))
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/emails/", get(list_emails))
        .route("/api/v1/emails/process", post(process_emails))
        .route("/api/v1/emails/generate", post(generate_email))
        .route("/api/v1/emails/send", post(send_email))
        .route("/api/v1/emails/{id}", get(get_email).delete(delete_email))
        .route("/api/v1/calendar-events/", get(list_events).post(create_event))
        .route(
            "/api/v1/calendar-events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/v1/calendar-events/{id}/confirm", post(confirm_event))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app()).await
}

async fn health() -> &'static str {
    "ok"
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<AuthToken>), Failure> {
    let mut store = db.write().await;
    if store.users.contains_key(&input.email) {
        return Err(Failure::new(StatusCode::CONFLICT, "Email already registered"));
    }
    let id = store.next_id();
    store.users.insert(
        input.email.clone(),
        User {
            id,
            email: input.email.clone(),
            password: input.password,
            full_name: Some(input.name),
        },
    );
    let access_token = store.issue_token(id);
    debug!(user_id = id, "registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthToken {
            access_token,
            token_type: "bearer".into(),
            user_id: id,
            email: input.email,
        }),
    ))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginInput>,
) -> Result<Json<AuthToken>, Failure> {
    let mut store = db.write().await;
    let user_id = match store.users.get(&input.email) {
        Some(user) if user.password == input.password => user.id,
        _ => {
            return Err(Failure::new(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ))
        }
    };
    let access_token = store.issue_token(user_id);
    Ok(Json(AuthToken {
        access_token,
        token_type: "bearer".into(),
        user_id,
        email: input.email,
    }))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    authenticate(&store, &headers)?;
    if let Some(token) = bearer_token(&headers) {
        store.sessions.remove(token);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn google_url(Query(query): Query<OAuthQuery>) -> Json<serde_json::Value> {
    let mut url = "https://accounts.google.com/o/oauth2/v2/auth?client_id=mock-client&response_type=code".to_string();
    if let Some(state) = query.state.filter(|s| !s.is_empty()) {
        url.push_str("&state=");
        url.push_str(&urlencoding::encode(&state));
    }
    Json(json!({ "auth_url": url }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<serde_json::Value>, Failure> {
    let store = db.read().await;
    let user_id = authenticate(&store, &headers)?;
    let user = store
        .user_by_id(user_id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "User not found"))?;
    Ok(Json(json!({
        "id": user.id,
        "email": user.email,
        "full_name": user.full_name,
        "role": "user",
        "is_active": true,
        "google_sub": null,
    })))
}

async fn list_emails(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Email>>, Failure> {
    let store = db.read().await;
    let user_id = authenticate(&store, &headers)?;
    let emails = store
        .emails
        .values()
        .filter(|e| e.user_id == user_id)
        .skip(query.skip)
        .take(query.limit)
        .cloned()
        .collect();
    Ok(Json(emails))
}

async fn get_email(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Email>, Failure> {
    let store = db.read().await;
    let user_id = authenticate(&store, &headers)?;
    let email = store
        .emails
        .get(&id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Email not found"))?;
    if email.user_id != user_id {
        return Err(Failure::new(
            StatusCode::FORBIDDEN,
            "Access denied: you don't own this email",
        ));
    }
    Ok(Json(email.clone()))
}

async fn delete_email(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, Failure> {
    let mut store = db.write().await;
    let user_id = authenticate(&store, &headers)?;
    match store.emails.get(&id) {
        None => return Err(Failure::new(StatusCode::NOT_FOUND, "Email not found")),
        Some(email) if email.user_id != user_id => {
            return Err(Failure::new(
                StatusCode::FORBIDDEN,
                "Access denied: you don't own this email",
            ))
        }
        Some(_) => {}
    }
    store.emails.remove(&id);
    Ok(Json(json!({ "success": true, "message": "Email deleted successfully" })))
}

async fn process_emails(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ProcessInput>,
) -> Result<Json<serde_json::Value>, Failure> {
    if !(1..=50).contains(&input.max_results) {
        return Err(Failure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "max_results must be between 1 and 50",
        ));
    }
    let mut store = db.write().await;
    let user_id = authenticate(&store, &headers)?;
    let to_address = store.user_by_id(user_id).map(|u| u.email.clone());

    let mut processed = 0u32;
    for (from, subject, snippet, start, end, location) in
        INBOX_FIXTURES.iter().take(input.max_results as usize)
    {
        let email_id = store.next_id();
        store.emails.insert(
            email_id,
            Email {
                id: email_id,
                user_id,
                email_id: format!("gmail-{}", Uuid::new_v4().simple()),
                thread_id: None,
                from_address: Some((*from).to_string()),
                to_address: to_address.clone(),
                subject: Some((*subject).to_string()),
                received_at: Some(TIMESTAMP.to_string()),
                snippet: Some((*snippet).to_string()),
                body_text: Some((*snippet).to_string()),
                created_at: TIMESTAMP.to_string(),
                updated_at: TIMESTAMP.to_string(),
            },
        );
        let event_id = store.next_id();
        store.events.insert(
            event_id,
            CalendarEvent {
                id: event_id,
                user_id,
                summary: (*subject).to_string(),
                location: Some((*location).to_string()),
                description: Some((*snippet).to_string()),
                start_time: (*start).to_string(),
                end_time: (*end).to_string(),
                attendees: Some((*from).to_string()),
                created_at: TIMESTAMP.to_string(),
                updated_at: TIMESTAMP.to_string(),
            },
        );
        processed += 1;
    }

    Ok(Json(json!({
        "success": true,
        "processed_count": processed,
        "created_events_count": processed,
        "message": format!("Processed {processed} emails"),
    })))
}

async fn generate_email(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<GenerateInput>,
) -> Result<Json<serde_json::Value>, Failure> {
    authenticate(&*db.read().await, &headers)?;
    let greeting = input
        .recipient_name
        .map(|name| format!("Dear {name},"))
        .unwrap_or_else(|| "Hello,".to_string());
    let signature = input.sender_name.unwrap_or_else(|| "Best regards".to_string());
    let body = format!("{greeting}\n\n{}\n\n{signature}", input.brief_content);
    Ok(Json(json!({
        "success": true,
        "data": {
            "subject": input.subject.unwrap_or_else(|| "(no subject)".to_string()),
            "body": body,
            "body_html": format!("<p>{}</p>", body.replace("\n\n", "</p><p>")),
        },
        "message": format!("Generated a {} email", input.tone),
    })))
}

async fn send_email(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SendInput>,
) -> Result<Json<serde_json::Value>, Failure> {
    authenticate(&*db.read().await, &headers)?;
    if input.to.is_empty() || input.subject.is_empty() || input.body.is_empty() {
        return Err(Failure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "to, subject and body are required",
        ));
    }
    Ok(Json(json!({ "success": true, "message": format!("Email sent to {}", input.to) })))
}

async fn list_events(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CalendarEvent>>, Failure> {
    let store = db.read().await;
    let user_id = authenticate(&store, &headers)?;
    let events = store
        .events
        .values()
        .filter(|e| e.user_id == user_id)
        .skip(query.skip)
        .take(query.limit)
        .cloned()
        .collect();
    Ok(Json(events))
}

async fn create_event(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewEvent>,
) -> Result<(StatusCode, Json<CalendarEvent>), Failure> {
    let mut store = db.write().await;
    let user_id = authenticate(&store, &headers)?;
    if input.user_id != user_id {
        return Err(Failure::new(
            StatusCode::FORBIDDEN,
            "Access denied: cannot create events for another user",
        ));
    }
    let id = store.next_id();
    let event = CalendarEvent {
        id,
        user_id,
        summary: input.summary,
        location: input.location,
        description: input.description,
        start_time: input.start_time,
        end_time: input.end_time,
        attendees: input.attendees,
        created_at: TIMESTAMP.to_string(),
        updated_at: TIMESTAMP.to_string(),
    };
    store.events.insert(id, event.clone());
    Ok((StatusCode::CREATED, Json(event)))
}

fn owned_event<'a>(store: &'a Store, id: i64, user_id: i64) -> Result<&'a CalendarEvent, Failure> {
    let event = store
        .events
        .get(&id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Calendar event not found"))?;
    if event.user_id != user_id {
        return Err(Failure::new(
            StatusCode::FORBIDDEN,
            "Access denied: you don't own this event",
        ));
    }
    Ok(event)
}

async fn get_event(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<CalendarEvent>, Failure> {
    let store = db.read().await;
    let user_id = authenticate(&store, &headers)?;
    owned_event(&store, id, user_id).cloned().map(Json)
}

async fn update_event(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<CalendarEvent>, Failure> {
    let mut store = db.write().await;
    let user_id = authenticate(&store, &headers)?;
    owned_event(&store, id, user_id)?;
    let event = store
        .events
        .get_mut(&id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Calendar event not found"))?;
    if let Some(summary) = patch.summary {
        event.summary = summary;
    }
    if let Some(location) = patch.location {
        event.location = Some(location);
    }
    if let Some(description) = patch.description {
        event.description = Some(description);
    }
    if let Some(start_time) = patch.start_time {
        event.start_time = start_time;
    }
    if let Some(end_time) = patch.end_time {
        event.end_time = end_time;
    }
    if let Some(attendees) = patch.attendees {
        event.attendees = Some(attendees);
    }
    Ok(Json(event.clone()))
}

async fn delete_event(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, Failure> {
    let mut store = db.write().await;
    let user_id = authenticate(&store, &headers)?;
    owned_event(&store, id, user_id)?;
    store.events.remove(&id);
    Ok(Json(json!({ "success": true, "message": "Calendar event deleted successfully" })))
}

async fn confirm_event(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, Failure> {
    let mut store = db.write().await;
    let user_id = authenticate(&store, &headers)?;
    // Confirming someone else's event looks like a missing one.
    match store.events.get(&id) {
        Some(event) if event.user_id == user_id => {}
        _ => {
            return Err(Failure::new(
                StatusCode::NOT_FOUND,
                "Calendar event not found",
            ))
        }
    }
    store.events.remove(&id);
    Ok(Json(json!({
        "success": true,
        "message": "Event confirmed and synced to Google Calendar",
        "calendar_event_id": id,
        "google_event_id": format!("gcal-{}", Uuid::new_v4().simple()),
    })))
}
