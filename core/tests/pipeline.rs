//! Request pipeline behavior against a recording in-process transport.
//!
//! # Design
//! `Recorder` captures every `HttpRequest` the client dispatches and answers
//! from a queue of canned responses, so header injection, body encoding,
//! status classification and logout cleanup can be checked without sockets.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailcal_core::{
    AbortController, ApiClient, ApiError, ClientConfig, HttpMethod, HttpRequest, HttpResponse,
    LoginRequest, Payload, RegisterRequest, RequestBody, RequestOptions, TokenStore, Transport,
    TransportError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, String>>>>,
}

impl Recorder {
    fn reply(&self, response: Result<HttpResponse, String>) {
        self.responses.lock().push_back(response);
    }

    fn last(&self) -> HttpRequest {
        self.requests.lock().last().cloned().expect("no request recorded")
    }

    fn count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(message.into()),
            None => Ok(json_response(200, "{}")),
        }
    }
}

/// Never answers; stands in for a hung connection.
struct Hang;

#[async_trait]
impl Transport for Hang {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        std::future::pending().await
    }
}

fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".into(), "application/json".into())],
        body: body.as_bytes().to_vec(),
    }
}

fn client() -> (ApiClient<Recorder>, Recorder) {
    let recorder = Recorder::default();
    let client = ApiClient::new(
        ClientConfig::new("http://api.test"),
        TokenStore::in_memory(),
        recorder.clone(),
    );
    (client, recorder)
}

#[tokio::test]
async fn structured_body_is_marked_and_serialized() {
    let (client, recorder) = client();
    client
        .post("/api/v1/emails/process", Some(RequestBody::Json(json!({"max_results": 10}))))
        .await
        .unwrap();

    let sent = recorder.last();
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.url, "http://api.test/api/v1/emails/process");
    assert_eq!(sent.header("Content-Type"), Some("application/json"));
    let body: Value = serde_json::from_slice(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"max_results": 10}));
}

#[tokio::test]
async fn stored_token_becomes_bearer_header() {
    let (client, recorder) = client();
    client.tokens().set_token("abc");
    client.get("/api/v1/emails/", [("skip", 0), ("limit", 5)]).await.unwrap();

    let sent = recorder.last();
    assert_eq!(sent.header("Authorization"), Some("Bearer abc"));
    assert_eq!(sent.url, "http://api.test/api/v1/emails/?skip=0&limit=5");
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization() {
    let (client, recorder) = client();
    client.get("/api/v1/auth/google/url", Vec::<(&str, &str)>::new()).await.unwrap();
    assert!(recorder.last().header("Authorization").is_none());
}

#[tokio::test]
async fn caller_authorization_override_is_respected() {
    let (client, recorder) = client();
    client.tokens().set_token("abc");
    client
        .request(
            "/public",
            RequestOptions::new(HttpMethod::Get).header("Authorization", ""),
        )
        .await
        .unwrap();
    assert_eq!(recorder.last().header("authorization"), Some(""));
}

#[tokio::test]
async fn success_payload_is_returned_unwrapped() {
    let (client, recorder) = client();
    recorder.reply(Ok(json_response(200, r#"{"id":1}"#)));
    let payload = client.get("/thing", Vec::<(&str, &str)>::new()).await.unwrap();
    assert_eq!(payload, Payload::Json(json!({"id": 1})));
}

#[tokio::test]
async fn not_found_raises_http_error_with_message() {
    let (client, recorder) = client();
    recorder.reply(Ok(json_response(404, r#"{"message":"not found"}"#)));
    let err = client.delete("/api/v1/emails/9", None).await.unwrap_err();
    match err {
        ApiError::Http { status, message, .. } => {
            assert_eq!(status, 404);
            assert_eq!(message, "not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_propagates_unannotated() {
    let (client, recorder) = client();
    recorder.reply(Err("connection refused".into()));
    let err = client.get("/x", Vec::<(&str, &str)>::new()).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.to_string(), "connection refused");
}

#[tokio::test]
async fn login_stores_access_token_and_notifies() {
    let (client, recorder) = client();
    let mut events = client.tokens().subscribe();
    recorder.reply(Ok(json_response(
        200,
        r#"{"access_token":"jwt-1","token_type":"bearer","user_id":3,"email":"a@b.c"}"#,
    )));

    let session = client
        .login(&LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();

    assert_eq!(session.user_id, 3);
    assert_eq!(client.tokens().get_token(), "jwt-1");
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());

    let sent = recorder.last();
    assert_eq!(sent.url, "http://api.test/api/v1/auth/login");
    assert!(sent.header("Authorization").is_none());
}

#[tokio::test]
async fn register_sends_canonical_fields() {
    let (client, recorder) = client();
    recorder.reply(Ok(json_response(
        201,
        r#"{"access_token":"jwt-2","token_type":"bearer","user_id":4,"email":"n@b.c"}"#,
    )));

    client
        .register(&RegisterRequest {
            email: "n@b.c".into(),
            password: "pw".into(),
            name: "Nora".into(),
        })
        .await
        .unwrap();

    let body: Value = serde_json::from_slice(recorder.last().body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"email": "n@b.c", "password": "pw", "name": "Nora"}));
    assert_eq!(client.tokens().get_token(), "jwt-2");
}

#[tokio::test]
async fn failed_login_leaves_token_untouched() {
    let (client, recorder) = client();
    recorder.reply(Ok(json_response(401, r#"{"detail":"Invalid email or password"}"#)));
    let err = client
        .login(&LoginRequest {
            email: "a@b.c".into(),
            password: "bad".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(client.tokens().get_token(), "");
}

#[tokio::test]
async fn logout_clears_token_when_network_call_fails() {
    let (client, recorder) = client();
    client.tokens().set_token("abc");
    recorder.reply(Err("connection reset".into()));

    assert!(client.logout().await.is_err());
    assert_eq!(client.tokens().get_token(), "");
    assert_eq!(recorder.last().header("Authorization"), Some("Bearer abc"));
}

#[tokio::test]
async fn logout_clears_token_on_server_error() {
    let (client, recorder) = client();
    client.tokens().set_token("abc");
    recorder.reply(Ok(json_response(500, r#"{"detail":"boom"}"#)));

    let err = client.logout().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!client.tokens().has_token());
}

#[tokio::test]
async fn dropped_logout_still_clears_token() {
    let tokens = TokenStore::in_memory();
    tokens.set_token("abc");
    let client = ApiClient::new(ClientConfig::new("http://api.test"), tokens.clone(), Hang);

    let outcome = tokio::time::timeout(Duration::from_millis(20), client.logout()).await;
    assert!(outcome.is_err(), "logout should still be pending");
    assert_eq!(tokens.get_token(), "");
}

#[tokio::test]
async fn pre_aborted_signal_skips_dispatch() {
    let (client, recorder) = client();
    let controller = AbortController::new();
    controller.abort();

    let err = client
        .request("/x", RequestOptions::default().signal(controller.signal()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Aborted));
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn abort_interrupts_hung_request() {
    let client = ApiClient::new(ClientConfig::new("http://api.test"), TokenStore::in_memory(), Hang);
    let controller = AbortController::new();
    let signal = controller.signal();

    let aborter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.abort();
    });

    let err = client
        .request("/slow", RequestOptions::default().signal(signal))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Aborted));
    assert!(err.is_transport());
    aborter.await.unwrap();
}

#[tokio::test]
async fn each_request_snapshots_the_current_token() {
    let (client, recorder) = client();
    client.tokens().set_token("first");
    client.get("/a", Vec::<(&str, &str)>::new()).await.unwrap();
    client.tokens().set_token("second");
    client.get("/b", Vec::<(&str, &str)>::new()).await.unwrap();

    let requests = recorder.requests.lock();
    assert_eq!(requests[0].header("Authorization"), Some("Bearer first"));
    assert_eq!(requests[1].header("Authorization"), Some("Bearer second"));
}
