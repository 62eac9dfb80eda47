//! Verify build/parse methods and the route guard against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file describes inputs and the expected outcome. Bodies are
//! compared as parsed JSON (not raw strings) to avoid false negatives from
//! field-ordering differences.

use mailcal_core::{
    ApiClient, ApiError, ClientConfig, DecodePolicy, GuardDecision, HttpMethod, HttpResponse,
    Payload, RequestBody, RequestOptions, Router, TokenStore,
};
use serde_json::Value;

const BASE_URL: &str = "http://api.test";

fn client(token: &str, policy: DecodePolicy) -> ApiClient<()> {
    let tokens = TokenStore::in_memory();
    if !token.is_empty() {
        tokens.set_token(token);
    }
    ApiClient::new(ClientConfig::new(BASE_URL).with_decode_policy(policy), tokens, ())
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_headers(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/request.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let expected = &case["expected_request"];

        let c = client(case["token"].as_str().unwrap(), DecodePolicy::Lenient);
        let mut options = RequestOptions::new(parse_method(input["method"].as_str().unwrap()));
        for (key, value) in parse_headers(&input["headers"]) {
            options = options.header(key, value);
        }
        if !input["body"].is_null() {
            options = options.body(RequestBody::Json(input["body"].clone()));
        }

        let req = c.build_request(input["path"].as_str().unwrap(), options).unwrap();
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, parse_headers(&expected["headers"]), "{name}: headers");

        match req.body.as_deref() {
            Some(bytes) => {
                let body: Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
            }
            None => assert!(expected["body"].is_null(), "{name}: missing body"),
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/response.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let policy = match case["policy"].as_str().unwrap() {
            "strict" => DecodePolicy::Strict,
            _ => DecodePolicy::Lenient,
        };
        let sim = &case["response"];
        let headers = sim["content_type"]
            .as_str()
            .map(|ct| vec![("content-type".to_string(), ct.to_string())])
            .unwrap_or_default();
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers,
            body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
        };

        let result = client("", policy).parse_response(response);
        let expected = &case["expected"];

        if let Some(json) = expected.get("json") {
            assert_eq!(result.unwrap(), Payload::Json(json.clone()), "{name}");
        } else if let Some(text) = expected.get("text") {
            assert_eq!(
                result.unwrap(),
                Payload::Text(text.as_str().unwrap().to_string()),
                "{name}"
            );
        } else {
            let error = &expected["error"];
            let err = result.unwrap_err();
            match (error["kind"].as_str().unwrap(), err) {
                ("decode", ApiError::Decode(_)) => {}
                ("http", ApiError::Http { status, message, .. }) => {
                    assert_eq!(u64::from(status), error["status"].as_u64().unwrap(), "{name}: status");
                    assert_eq!(message, error["message"].as_str().unwrap(), "{name}: message");
                }
                (kind, other) => panic!("{name}: expected {kind}, got {other:?}"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Route guard
// ---------------------------------------------------------------------------

#[test]
fn guard_test_vectors() {
    let raw = include_str!("../../test-vectors/guard.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let target = case["target"].as_str().unwrap();

        let tokens = TokenStore::in_memory();
        if case["authenticated"].as_bool().unwrap() {
            tokens.set_token("tok");
        }
        let router = Router::with_default_routes(tokens);

        let expected = &case["expected"];
        let expected = if expected == "allow" {
            GuardDecision::Allow
        } else if let Some(redirect) = expected.get("login") {
            GuardDecision::RedirectToLogin {
                redirect: redirect.as_str().unwrap().to_string(),
            }
        } else {
            GuardDecision::RedirectHome {
                to: expected["home"].as_str().unwrap().to_string(),
            }
        };

        let decision = router.before_each(target);
        assert_eq!(decision, expected, "{name}: decision");
        assert_eq!(
            decision.destination(target),
            case["destination"].as_str().unwrap(),
            "{name}: destination"
        );
    }
}
