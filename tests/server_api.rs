//! HTTP API Integration Tests
//!
//! Each test boots a real `CoachServer` on an ephemeral port, backed by a
//! mocked provider endpoint, then drives it over HTTP the way a client
//! would. Coverage: input validation, rate limiting, persistence, history
//! context, and error mapping at the boundary.

use std::sync::Arc;

use braindoc::config::Config;
use braindoc::engine::CoachEngine;
use braindoc::llm::LlmClient;
use braindoc::server::CoachServer;
use braindoc::store::SessionStore;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A well-formed five-section reply for the mocked provider.
const COACH_REPLY: &str = "💬 Quote: \"Why do we fall? So we can learn to pick ourselves up.\" - Alfred, Batman Begins\n\n\
    🎬 Movie Scene: Bruce Wayne climbs out of the pit without the rope, fear finally working for him.\n\n\
    💡 Deep Meaning: The fall is the curriculum, not the verdict.\n\n\
    ✨ Actionable Path: 1. Write down what failed. 2. Pick one fixable piece. 3. Start it tonight.\n\n\
    🌟 Affirmation: I rise every time I fall.";

async fn start_coach(
    provider: &MockServer,
    max_requests: u32,
    store: Option<Arc<SessionStore>>,
) -> CoachServer {
    let mut config = Config::default();
    config.llm.api_url = provider.uri();
    config.server.port = 0;
    config.limits.max_requests = max_requests;

    let engine = CoachEngine::new(LlmClient::new(&config.llm, "test-key".to_string()));
    CoachServer::start(&config, engine, store)
        .await
        .expect("server should start on an ephemeral port")
}

fn temp_store() -> (tempfile::TempDir, Arc<SessionStore>) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let store = Arc::new(SessionStore::open(dir.path()).expect("open store"));
    (dir, store)
}

async fn mount_provider_reply(provider: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(provider)
        .await;
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1234567890,
        "model": "gpt-4",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn motivate_url(server: &CoachServer) -> String {
    format!("http://{}/api/motivate", server.addr())
}

fn sessions_url(server: &CoachServer, user_id: &str) -> String {
    format!("http://{}/api/sessions/{user_id}", server.addr())
}

// ────────────────────────────────────────────────────────────────────────────
// Readiness and Validation
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_endpoint_reports_ready() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 10, None).await;

    let resp = reqwest::get(motivate_url(&server)).await.expect("GET status");
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.expect("status JSON");
    assert_eq!(body["message"], "My Brain Doctor API is running");
    assert!(body["usage"].as_str().unwrap().contains("POST /api/motivate"));
    assert!(body["example"]["situation"].as_str().unwrap().len() >= 10);
}

#[tokio::test]
async fn test_rejects_short_situation() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 10, None).await;

    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "help"}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(
        body["error"],
        "Please provide a detailed situation (at least 10 characters)"
    );
}

#[tokio::test]
async fn test_missing_situation_field_is_rejected_as_too_short() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 10, None).await;

    // No situation key at all; must reach the length check, not a
    // framework-level deserialization error.
    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"user_id": "u-1"}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(
        body["error"],
        "Please provide a detailed situation (at least 10 characters)"
    );
}

#[tokio::test]
async fn test_rejects_whitespace_padded_situation() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 10, None).await;

    // 14 characters raw, 4 after trimming.
    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "     help     "}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_rejects_overlong_situation() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 10, None).await;

    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "x".repeat(5001)}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(body["error"], "Situation is too long (maximum 5000 characters)");
}

// ────────────────────────────────────────────────────────────────────────────
// Generation and Persistence
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_motivate_round_trip_persists_session() {
    let provider = MockServer::start().await;
    mount_provider_reply(&provider, COACH_REPLY).await;
    let (_dir, store) = temp_store();
    let server = start_coach(&provider, 10, Some(store)).await;

    let situation = "I feel hopeless and I'm ready to give up.";
    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": situation, "user_id": "user-7"}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.expect("reply JSON");
    assert_eq!(body["success"], true);
    assert_eq!(body["sentiment"], "despair");
    assert_eq!(body["response"], COACH_REPLY);
    assert!(body["parsed"]["quote"].as_str().unwrap().contains("Alfred"));
    let score = body["validation_score"].as_f64().expect("score");
    assert!((0.0..=10.0).contains(&score));
    let id = body["id"].as_str().expect("persisted id").to_string();
    assert!(!id.is_empty());

    let resp = reqwest::get(sessions_url(&server, "user-7"))
        .await
        .expect("GET sessions");
    assert_eq!(resp.status().as_u16(), 200);
    let history: Value = resp.json().await.expect("sessions JSON");
    assert_eq!(history["user_id"], "user-7");
    assert_eq!(history["count"], 1);
    assert_eq!(history["sessions"][0]["id"], id);
    assert_eq!(history["sessions"][0]["situation"], situation);
    assert_eq!(history["sessions"][0]["sentiment"], "despair");
    assert!(
        history["sessions"][0]["created_at"]
            .as_str()
            .unwrap()
            .contains('T'),
        "created_at should be RFC 3339"
    );
}

#[tokio::test]
async fn test_anonymous_request_gets_reply_without_persistence() {
    let provider = MockServer::start().await;
    mount_provider_reply(&provider, COACH_REPLY).await;
    let (_dir, store) = temp_store();
    let server = start_coach(&provider, 10, Some(store.clone())).await;

    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "Nothing I do seems to matter anymore."}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.expect("reply JSON");
    assert_eq!(body["success"], true);
    assert!(body.get("id").is_none(), "nothing stored, no id");
    assert_eq!(store.count("anonymous").expect("count"), 0);
}

#[tokio::test]
async fn test_second_session_feeds_history_into_prompt() {
    let provider = MockServer::start().await;
    let (_dir, store) = temp_store();

    // Mounted first, so the returning-user request must land here.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(user_prompt_contains(
            "CONTEXT: User has 1 previous sessions. Build on their journey.",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(COACH_REPLY)))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(COACH_REPLY)))
        .expect(1)
        .mount(&provider)
        .await;

    let server = start_coach(&provider, 10, Some(store)).await;
    let client = reqwest::Client::new();

    for situation in [
        "I got rejected from my dream school today.",
        "The waitlist decision came back negative too.",
    ] {
        let resp = client
            .post(motivate_url(&server))
            .json(&json!({"situation": situation, "user_id": "returning"}))
            .send()
            .await
            .expect("POST");
        assert_eq!(resp.status().as_u16(), 200);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rate Limiting
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rate_limit_returns_429_with_retry_after() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 2, None).await;
    let client = reqwest::Client::new();

    // The limiter runs before validation, so short bodies burn budget
    // without touching the provider.
    for _ in 0..2 {
        let resp = client
            .post(motivate_url(&server))
            .json(&json!({"situation": "help", "user_id": "heavy"}))
            .send()
            .await
            .expect("POST");
        assert_eq!(resp.status().as_u16(), 400);
    }

    let resp = client
        .post(motivate_url(&server))
        .json(&json!({"situation": "help", "user_id": "heavy"}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 429);
    let header = resp
        .headers()
        .get("retry-after")
        .expect("Retry-After header")
        .to_str()
        .expect("header value")
        .to_string();
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(body["error"], "Too many requests. Please slow down.");
    let retry_after = body["retry_after_secs"].as_u64().expect("retry_after_secs");
    assert!(retry_after >= 1);
    assert_eq!(header, retry_after.to_string());
}

#[tokio::test]
async fn test_rate_limit_is_per_user() {
    let provider = MockServer::start().await;
    let server = start_coach(&provider, 1, None).await;
    let client = reqwest::Client::new();

    let post = |user: &'static str| {
        let client = client.clone();
        let url = motivate_url(&server);
        async move {
            client
                .post(url)
                .json(&json!({"situation": "help", "user_id": user}))
                .send()
                .await
                .expect("POST")
                .status()
                .as_u16()
        }
    };

    assert_eq!(post("user-a").await, 400);
    assert_eq!(post("user-a").await, 429, "user-a's budget is spent");
    assert_eq!(post("user-b").await, 400, "user-b has a separate budget");

    // Callers without an id share one anonymous budget.
    let anon = client
        .post(motivate_url(&server))
        .json(&json!({"situation": "help"}))
        .send()
        .await
        .expect("POST");
    assert_eq!(anon.status().as_u16(), 400);
}

// ────────────────────────────────────────────────────────────────────────────
// Failure Paths and History
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_provider_failure_maps_to_bad_gateway() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "Internal server error", "type": "server_error"}
        })))
        .mount(&provider)
        .await;
    let server = start_coach(&provider, 10, None).await;

    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "Everything is going wrong at once."}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 502);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(body["error"], "Failed to generate motivation. Please try again.");
    assert!(!body["details"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_persist_failure_fails_the_request() {
    let provider = MockServer::start().await;
    mount_provider_reply(&provider, COACH_REPLY).await;
    let (dir, store) = temp_store();
    let server = start_coach(&provider, 10, Some(store)).await;

    // Break the store out from under the running server.
    rusqlite::Connection::open(dir.path().join("braindoc.db3"))
        .expect("open db")
        .execute("DROP TABLE sessions", [])
        .expect("drop sessions table");

    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "Nothing I do seems to matter anymore.", "user_id": "u-1"}))
        .send()
        .await
        .expect("POST");

    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(body["error"], "Failed to generate motivation. Please try again.");
    assert!(!body["details"].as_str().unwrap().is_empty());
    assert!(
        body.get("success").is_none(),
        "no partial result when the session could not be stored"
    );
}

#[tokio::test]
async fn test_history_read_failure_reports_history_error() {
    let provider = MockServer::start().await;
    let (dir, store) = temp_store();
    let server = start_coach(&provider, 10, Some(store)).await;

    rusqlite::Connection::open(dir.path().join("braindoc.db3"))
        .expect("open db")
        .execute("DROP TABLE sessions", [])
        .expect("drop sessions table");

    let resp = reqwest::get(sessions_url(&server, "u-1"))
        .await
        .expect("GET sessions");
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(body["error"], "Failed to load session history.");
}

#[tokio::test]
async fn test_sessions_endpoint_disabled_without_store() {
    let provider = MockServer::start().await;
    mount_provider_reply(&provider, COACH_REPLY).await;
    let server = start_coach(&provider, 10, None).await;

    let resp = reqwest::get(sessions_url(&server, "anyone"))
        .await
        .expect("GET sessions");
    assert_eq!(resp.status().as_u16(), 503);
    let body: Value = resp.json().await.expect("error JSON");
    assert_eq!(body["error"], "Session history is not available on this server.");

    // Generation still works; the reply just has no session id.
    let resp = reqwest::Client::new()
        .post(motivate_url(&server))
        .json(&json!({"situation": "Nothing I do seems to matter anymore.", "user_id": "u-1"}))
        .send()
        .await
        .expect("POST");
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.expect("reply JSON");
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn test_sessions_returned_newest_first() {
    let provider = MockServer::start().await;
    mount_provider_reply(&provider, COACH_REPLY).await;
    let (_dir, store) = temp_store();
    let server = start_coach(&provider, 10, Some(store)).await;
    let client = reqwest::Client::new();

    for situation in [
        "First week at the new job is crushing me.",
        "Second week and I still feel like a fraud.",
    ] {
        let resp = client
            .post(motivate_url(&server))
            .json(&json!({"situation": situation, "user_id": "diarist"}))
            .send()
            .await
            .expect("POST");
        assert_eq!(resp.status().as_u16(), 200);
    }

    let history: Value = reqwest::get(sessions_url(&server, "diarist"))
        .await
        .expect("GET sessions")
        .json()
        .await
        .expect("sessions JSON");

    assert_eq!(history["count"], 2);
    assert_eq!(
        history["sessions"][0]["situation"],
        "Second week and I still feel like a fraud."
    );
    assert_eq!(
        history["sessions"][1]["situation"],
        "First week at the new job is crushing me."
    );
}

/// Matcher over the user-message prompt text in the request body.
fn user_prompt_contains(needle: &'static str) -> impl wiremock::Match {
    move |request: &Request| {
        let Ok(body) = serde_json::from_slice::<serde_json::Value>(&request.body) else {
            return false;
        };
        body["messages"][1]["content"]
            .as_str()
            .is_some_and(|content| content.contains(needle))
    }
}
