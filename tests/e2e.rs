//! End-to-end tests: full router, in-memory database, mocked Gemini and
//! Google endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use termwise::AppState;
use termwise::auth::google::GoogleOAuth;
use termwise::auth::token;
use termwise::config::Config;
use termwise::db::Database;
use termwise::gemini::GeminiClient;
use termwise::quota::{QuotaGuard, spawn_audit_logger};

const JWT_SECRET: &str = "test-secret";

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct TestApp {
    app: Router,
    state: AppState,
}

/// Build the full application against a mock upstream. The Gemini endpoint
/// points at `{mock}/generate`; the Google token and userinfo endpoints point
/// at `{mock}/oauth/token` and `{mock}/oauth/userinfo`.
fn test_app(mock_uri: &str, daily_limit: i64) -> TestApp {
    let mut config = Config::default();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.quota.daily_limit = daily_limit;
    config.gemini.api_key = "test-key".to_string();
    config.gemini.endpoint = format!("{mock_uri}/generate");
    config.google.client_id = "client-id".to_string();
    config.google.client_secret = "client-secret".to_string();
    config.google.token_endpoint = format!("{mock_uri}/oauth/token");
    config.google.userinfo_endpoint = format!("{mock_uri}/oauth/userinfo");

    let db = Database::open_in_memory().unwrap();
    let gemini = Arc::new(
        GeminiClient::new(
            config.gemini.endpoint.clone(),
            config.gemini.api_key.clone(),
            Duration::from_secs(5),
        )
        .unwrap(),
    );
    let quota = Arc::new(QuotaGuard::new(db.clone(), config.quota.daily_limit));
    let google = Arc::new(GoogleOAuth::new(config.google.clone()));
    let (audit_tx, audit_rx) = tokio::sync::mpsc::unbounded_channel();
    let _ = spawn_audit_logger(db.clone(), audit_rx);

    let state = AppState {
        config: Arc::new(config),
        db,
        gemini,
        quota,
        google,
        audit_tx,
    };

    TestApp {
        app: termwise::app(state.clone()),
        state,
    }
}

/// Provision a usage record and mint a valid session token for `email`.
fn login(state: &AppState, email: &str) -> String {
    state.quota.provision(email).unwrap();
    token::issue(email, chrono::Duration::days(1), JWT_SECRET.as_bytes())
        .unwrap()
        .token
}

async fn post_json(app: &Router, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Gemini response envelope wrapping the given text.
fn envelope(text: &str) -> Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
}

fn calls_in_window(state: &AppState, email: &str) -> i64 {
    state
        .quota
        .get_record(email)
        .unwrap()
        .map(|r| r.calls_in_window)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Prompt flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prompt_classified_command_end_to_end() {
    let server = MockServer::start().await;

    // First call classifies, second generates the command.
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("which type of request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "```json\n{\"actionType\": \"COMMAND\", \"needsPwd\": false, \"needsFileStructure\": false}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("finding terminal commands"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("ls -la")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "list all files", "os": "darwin"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "ls -la");
    assert_eq!(body["actionType"], "COMMAND");
    assert_eq!(calls_in_window(&harness.state, "alice@example.com"), 1);
}

#[tokio::test]
async fn prompt_with_script_skips_classification() {
    let server = MockServer::start().await;

    // Exactly one model call: local rules already classified it.
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope("```sh\n#!/bin/sh\necho updated\n```")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({
            "prompt": "add a greeting",
            "os": "linux",
            "existingScript": "#!/bin/sh\necho hi"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actionType"], "SCRIPT");
    // Fences stripped, newlines preserved.
    assert_eq!(body["response"], "\n#!/bin/sh\necho updated\n");
}

#[tokio::test]
async fn prompt_cd_phrase_resolves_locally() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("cd command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("cd ~/projects/demo")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "take me to my demo project", "os": "darwin", "pwd": "/home/alice"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actionType"], "CHANGEDIRECTORY");
    assert_eq!(body["response"], "cd ~/projects/demo");
}

#[tokio::test]
async fn prompt_none_classification_falls_back() {
    let server = MockServer::start().await;

    // One classification call, no generation call.
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "{\"actionType\": \"NONE\", \"needsPwd\": false, \"needsFileStructure\": false}",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "write me a poem about rust"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "I also don't know");
    assert_eq!(body["actionType"], "NONE");
    // The classification call is still billable.
    assert_eq!(calls_in_window(&harness.state, "alice@example.com"), 1);
}

#[tokio::test]
async fn prompt_empty_payload_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"os": "linux", "pwd": "/home/alice"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
    assert_eq!(calls_in_window(&harness.state, "alice@example.com"), 0);
}

#[tokio::test]
async fn prompt_upstream_failure_hides_detail_and_keeps_quota() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("secret internal detail"))
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "list files"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = body["error"].as_str().unwrap();
    assert!(!msg.contains("secret internal detail"));
    // A failed completion consumes no quota.
    assert_eq!(calls_in_window(&harness.state, "alice@example.com"), 0);
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prompt_without_token_unauthorized() {
    let server = MockServer::start().await;
    let harness = test_app(&server.uri(), 50);

    let (status, body) = post_json(&harness.app, "/prompt", None, json!({"prompt": "ls"})).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn prompt_with_garbage_token_unauthorized() {
    let server = MockServer::start().await;
    let harness = test_app(&server.uri(), 50);

    let (status, _) = post_json(
        &harness.app,
        "/prompt",
        Some("not.a.token"),
        json!({"prompt": "ls"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn prompt_unprovisioned_identity_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    // Valid token, but no usage record was ever provisioned.
    let jwt = token::issue("ghost@example.com", chrono::Duration::days(1), JWT_SECRET.as_bytes())
        .unwrap()
        .token;

    let (status, _) = post_json(&harness.app, "/prompt", Some(&jwt), json!({"prompt": "ls"})).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prompt_over_quota_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 2);
    let jwt = login(&harness.state, "alice@example.com");
    harness.state.quota.record_usage("alice@example.com").unwrap();
    harness.state.quota.record_usage("alice@example.com").unwrap();

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "list files"}),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Daily quota limit reached");
}

#[tokio::test]
async fn prompt_quota_window_resets_after_a_day() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("which type of request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "{\"actionType\": \"COMMAND\", \"needsPwd\": false, \"needsFileStructure\": false}",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("finding terminal commands"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("ls")))
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 2);
    let jwt = login(&harness.state, "alice@example.com");
    harness.state.quota.record_usage("alice@example.com").unwrap();
    harness.state.quota.record_usage("alice@example.com").unwrap();

    // Push the window start 25 hours into the past.
    let past = (chrono::Utc::now() - chrono::Duration::hours(25)).to_rfc3339();
    harness
        .state
        .db
        .with_conn(|conn| {
            conn.execute(
                "UPDATE users SET window_start = ?1 WHERE email = 'alice@example.com'",
                rusqlite::params![past],
            )?;
            Ok(())
        })
        .unwrap();

    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "list files"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "ls");
    assert_eq!(calls_in_window(&harness.state, "alice@example.com"), 1);
}

// ---------------------------------------------------------------------------
// Token issuance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_flow_issues_usable_jwt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=4%2Fgood-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.access",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "bob@example.com",
            "verified_email": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("which type of request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            "{\"actionType\": \"COMMAND\", \"needsPwd\": false, \"needsFileStructure\": false}",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("finding terminal commands"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("pwd")))
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);

    let (status, body) = post_json(
        &harness.app,
        "/token",
        None,
        json!({"googleAuthCode": "4/good-code"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let jwt = body["jwtToken"].as_str().unwrap().to_string();
    assert!(body["expiry"].as_i64().unwrap() > chrono::Utc::now().timestamp());

    // The issued token works immediately: the record was provisioned.
    let (status, body) = post_json(
        &harness.app,
        "/prompt",
        Some(&jwt),
        json!({"prompt": "where am i"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "pwd");
}

#[tokio::test]
async fn token_flow_rejects_bad_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);

    let (status, body) = post_json(
        &harness.app,
        "/token",
        None,
        json!({"googleAuthCode": "bad"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid code");
}

#[tokio::test]
async fn token_flow_rejects_empty_code() {
    let server = MockServer::start().await;
    let harness = test_app(&server.uri(), 50);

    let (status, _) = post_json(&harness.app, "/token", None, json!({"googleAuthCode": ""})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Debug and project init
// ---------------------------------------------------------------------------

#[tokio::test]
async fn debug_explains_failed_command() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("terminal command errors"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope("Run it with sudo.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/debug",
        Some(&jwt),
        json!({"command": "apt install vim", "os": "linux", "error": "permission denied"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Run it with sudo.");
    assert_eq!(calls_in_window(&harness.state, "alice@example.com"), 1);
}

#[tokio::test]
async fn project_init_returns_parsed_commands() {
    let server = MockServer::start().await;

    let model_answer = "```json\n{\"projectType\": \"go project\", \"commands\": [{\"command\": \"brew install go\", \"description\": \"install go\"}, {\"command\": \"go run .\", \"description\": \"run the project\"},]}\n```";
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("running a project"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(model_answer)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, body) = post_json(
        &harness.app,
        "/run/init",
        Some(&jwt),
        json!({
            "files": ["main.go", "go.mod"],
            "readme": "# demo",
            "projectFolderName": "demo"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projectType"], "go project");
    assert_eq!(body["commands"].as_array().unwrap().len(), 2);
    assert_eq!(body["commands"][1]["command"], "go run .");
}

#[tokio::test]
async fn project_init_rejects_empty_files() {
    let server = MockServer::start().await;
    let harness = test_app(&server.uri(), 50);
    let jwt = login(&harness.state, "alice@example.com");

    let (status, _) = post_json(&harness.app, "/run/init", Some(&jwt), json!({"files": []})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_public() {
    let server = MockServer::start().await;
    let harness = test_app(&server.uri(), 50);

    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
