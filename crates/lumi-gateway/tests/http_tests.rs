// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driving the full router with in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use lumi_agent::{
    ConnectivityOrchestrator, ConversationEngine, ConversationSettings, OrchestratorSettings,
    TaskPool,
};
use lumi_config::model::{GatewayConfig, RateLimitConfig};
use lumi_core::{ChatKind, ChatStore, GatewayClient, Profile, SessionStatus, SharedConnectivity};
use lumi_gateway::{AppState, build_router};
use lumi_test_utils::{MemoryStore, MockCompletion, MockGateway};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const TOKEN: &str = "secret";

struct Harness {
    app: Router,
    gateway: Arc<MockGateway>,
    store: Arc<MemoryStore>,
    tasks: TaskPool,
}

fn harness(gateway: MockGateway) -> Harness {
    harness_with(gateway, Some(TOKEN), RateLimitConfig::default())
}

fn harness_with(gateway: MockGateway, token: Option<&str>, limits: RateLimitConfig) -> Harness {
    let gateway = Arc::new(gateway);
    let store = Arc::new(MemoryStore::new());
    let (tasks, _outcomes) = TaskPool::new(4, 32);
    let orchestrator = ConnectivityOrchestrator::new(
        gateway.clone(),
        store.clone(),
        Arc::new(SharedConnectivity::new()),
        tasks.clone(),
        OrchestratorSettings {
            session_name: "default".into(),
            poll_interval: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(20),
        },
    );
    let engine = ConversationEngine::new(
        store.clone(),
        gateway.clone(),
        Arc::new(MockCompletion::with_responses(["Hi from Lumi"])),
        ConversationSettings::default(),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        engine: Arc::new(engine),
        store: store.clone(),
        gateway: gateway.clone(),
        tasks: tasks.clone(),
        shutdown: CancellationToken::new(),
    };
    let config = GatewayConfig {
        bearer_token: token.map(String::from),
        ..GatewayConfig::default()
    };
    Harness {
        app: build_router(state, &config, &limits),
        gateway,
        store,
        tasks,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn profile() -> Profile {
    Profile {
        id: "15559990000@c.us".into(),
        push_name: "Ana".into(),
    }
}

// ---- Public routes ----

#[tokio::test]
async fn health_is_public_and_reports_gateway() {
    let h = harness(MockGateway::new());
    let request = Request::get("/api/v1/health").body(Body::empty()).unwrap();
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_code"], 200);
    assert_eq!(body["data"]["gateway"]["is_up"], true);
    assert_eq!(body["data"]["connectivity"], "unknown");
}

#[tokio::test]
async fn health_reports_unreachable_gateway() {
    let h = harness(MockGateway::new().unreachable());
    let (status, body) = send(&h.app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["gateway"]["is_up"], false);
}

#[tokio::test]
async fn webhook_status_event_updates_state_before_ack() {
    let h = harness(MockGateway::new());
    let event = json!({"event": "session.status", "session": "default", "payload": {"status": "SCAN_QR_CODE"}});
    let (status, _) = send(&h.app, post_json("/api/v1/webhook", event)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&h.app, get("/api/v1/whatsapp/status")).await;
    assert_eq!(body["data"]["status"], "SCAN_QR_CODE");
}

#[tokio::test]
async fn webhook_rejects_malformed_payload() {
    let h = harness(MockGateway::new());
    let request = Request::post("/api/v1/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid payload");
}

#[tokio::test]
async fn webhook_acknowledges_unknown_events() {
    let h = harness(MockGateway::new());
    let event = json!({"event": "presence.update", "session": "default", "payload": {}});
    let (status, _) = send(&h.app, post_json("/api/v1/webhook", event)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn webhook_message_is_processed_in_background() {
    let h = harness(MockGateway::new());
    h.store
        .register_chat("15550001111@c.us", "Alice", ChatKind::Chat)
        .await
        .unwrap();

    let event = json!({
        "event": "message",
        "session": "default",
        "payload": {
            "id": "false_15550001111@c.us_AAA",
            "timestamp": 1700000000,
            "from": "15550001111@c.us",
            "to": "15559990000@c.us",
            "body": "@lumi hello there",
            "fromMe": false,
            "source": "app",
            "hasMedia": false
        }
    });
    let (status, _) = send(&h.app, post_json("/api/v1/webhook", event)).await;
    assert_eq!(status, StatusCode::OK);

    assert!(h.tasks.drain(Duration::from_secs(5)).await);
    let sent = h.gateway.sent_texts().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].1, "Hi from Lumi");
}

#[tokio::test]
async fn webhook_rejects_message_without_chat() {
    let h = harness(MockGateway::new());
    let event = json!({
        "event": "message",
        "session": "default",
        "payload": {"id": "false_AAA", "body": "hello"}
    });
    let (status, body) = send(&h.app, post_json("/api/v1/webhook", event)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "message payload requires from and to");
    assert!(h.tasks.drain(Duration::from_secs(5)).await);
    assert!(h.store.list_chats().await.unwrap().is_empty());
    assert!(h.gateway.sent_texts().await.is_empty());
}

// ---- Auth ----

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let h = harness(MockGateway::new());
    let request = Request::get("/api/v1/whatsapp/status").body(Body::empty()).unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401);

    let wrong = Request::get("/api/v1/chats/registered")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, wrong).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_token_config_fails_closed() {
    let h = harness_with(MockGateway::new(), None, RateLimitConfig::default());
    let (status, _) = send(&h.app, get("/api/v1/whatsapp/status")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---- Session control ----

#[tokio::test(start_paused = true)]
async fn connect_returns_qr_image_while_scan_required() {
    let h = harness(MockGateway::new().with_statuses([SessionStatus::ScanRequired]));
    let response = h
        .app
        .clone()
        .oneshot(get("/api/v1/whatsapp/connect"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[tokio::test(start_paused = true)]
async fn connect_reports_linked_profile_and_registers_self() {
    let h = harness(
        MockGateway::new()
            .with_statuses([SessionStatus::Working])
            .with_profile(profile()),
    );
    let (status, body) = send(&h.app, get("/api/v1/whatsapp/connect")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Already logged in");
    assert_eq!(body["data"]["status"], "connected");
    assert_eq!(body["data"]["profile"]["id"], "15559990000@c.us");

    let chat = h.store.find_chat("15559990000@c.us").await.unwrap().unwrap();
    assert_eq!(chat.kind, ChatKind::SelfChat);
}

#[tokio::test(start_paused = true)]
async fn connect_surfaces_fatal_session_failure() {
    let h = harness(
        MockGateway::new().with_statuses([SessionStatus::Starting, SessionStatus::Failed]),
    );
    let (status, body) = send(&h.app, get("/api/v1/whatsapp/connect")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().starts_with("Failed to start session"));
}

#[tokio::test]
async fn code_requires_phone_number() {
    let h = harness(MockGateway::new());
    let (status, body) = send(&h.app, get("/api/v1/whatsapp/code")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "phoneNumber query parameter is required");
    assert_eq!(h.gateway.call_count("session_status").await, 0);
}

#[tokio::test(start_paused = true)]
async fn code_is_requested_once_session_is_usable() {
    let h = harness(MockGateway::new().with_statuses([SessionStatus::ScanRequired]));
    let (status, body) = send(&h.app, get("/api/v1/whatsapp/code?phoneNumber=15550001111")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Code requested successfully");
    assert_eq!(body["data"]["code"], "CODE-11");
}

#[tokio::test]
async fn me_reports_unavailable_session() {
    let h = harness(MockGateway::new().with_statuses([SessionStatus::ScanRequired]));
    h.gateway.session_status("default").await.unwrap();

    let (status, body) = send(&h.app, get("/api/v1/whatsapp/me")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to fetch profile. Ensure session is connected"));
    assert!(message.contains("SCAN_QR_CODE"));
}

#[tokio::test]
async fn stop_marks_session_stopped() {
    let h = harness(MockGateway::new());
    let stop = Request::post("/api/v1/whatsapp/stop")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, stop).await.0, StatusCode::OK);

    let (_, body) = send(&h.app, get("/api/v1/whatsapp/status")).await;
    assert_eq!(body["data"]["status"], "STOPPED");
}

// ---- Sends ----

#[tokio::test]
async fn send_text_rejects_unregistered_chat() {
    let h = harness(MockGateway::new());
    let request = post_json(
        "/api/v1/whatsapp/send/text",
        json!({"chat_id": "15550001111@c.us", "text": "hello"}),
    );
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Chat ID is not registered. Please register the chat/group first."
    );
    assert!(h.gateway.sent_texts().await.is_empty());
}

#[tokio::test]
async fn send_text_to_registered_chat() {
    let h = harness(MockGateway::new());
    h.store
        .register_chat("15550001111@c.us", "Alice", ChatKind::Chat)
        .await
        .unwrap();

    let request = post_json(
        "/api/v1/whatsapp/send/text",
        json!({"chat_id": "15550001111@c.us", "text": "hello"}),
    );
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "mock-message");
    assert_eq!(
        h.gateway.sent_texts().await,
        vec![("15550001111@c.us".to_string(), "hello".to_string())]
    );
}

#[tokio::test]
async fn send_text_validates_fields() {
    let h = harness(MockGateway::new());
    let (status, _) = send(
        &h.app,
        post_json("/api/v1/whatsapp/send/text", json!({"chat_id": "1@c.us"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_image_to_registered_chat() {
    let h = harness(MockGateway::new());
    h.store
        .register_chat("120363@g.us", "Team", ChatKind::Group)
        .await
        .unwrap();

    let request = post_json(
        "/api/v1/whatsapp/send/image",
        json!({
            "chat_id": "120363@g.us",
            "file": {"mimetype": "image/jpeg", "url": "https://example.com/a.jpg"},
            "caption": "look"
        }),
    );
    let (status, _) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    let images = h.gateway.sent_images().await;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].1.caption.as_deref(), Some("look"));
}

// ---- Chat registry ----

#[tokio::test]
async fn register_list_and_unregister_chat() {
    let h = harness(MockGateway::new());

    let (status, body) = send(
        &h.app,
        post_json("/api/v1/chats/register", json!({"chat_id": "120363@g.us", "name": "Team"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "group");

    let (_, body) = send(&h.app, get("/api/v1/chats/registered")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let delete = Request::delete("/api/v1/chats/register/120363@g.us")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, delete).await.0, StatusCode::OK);
    assert!(h.store.list_chats().await.unwrap().is_empty());
}

#[tokio::test]
async fn register_rejects_unknown_type() {
    let h = harness(MockGateway::new());
    let (status, _) = send(
        &h.app,
        post_json("/api/v1/chats/register", json!({"chat_id": "1@c.us", "type": "forum"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remote_chats_are_classified() {
    let chats = serde_json::from_value(json!([
        {"id": "1@c.us", "name": "Alice", "lastMessage": {"body": "hey"}},
        {"id": "2@g.us", "name": "Team"}
    ]))
    .unwrap();
    let h = harness(MockGateway::new().with_chats(chats));

    let (status, body) = send(&h.app, get("/api/v1/chats/remote/chats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["type"], "chat");
    assert_eq!(body["data"][0]["last_message"], "hey");
    assert_eq!(body["data"][1]["type"], "group");
}

// ---- Rate limiting ----

#[tokio::test]
async fn api_limit_returns_429_with_headers() {
    let limits = RateLimitConfig {
        api_limit: 2,
        ..RateLimitConfig::default()
    };
    let h = harness_with(MockGateway::new(), Some(TOKEN), limits);

    for expected_remaining in ["1", "0"] {
        let response = h.app.clone().oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let response = h.app.clone().oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert!(response.headers().contains_key("x-ratelimit-reset"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status_code"], 429);
    assert!(body["message"].as_str().unwrap().starts_with("Too Many Requests. Try again in"));
}

#[tokio::test]
async fn forwarded_clients_are_limited_separately() {
    let limits = RateLimitConfig {
        api_limit: 1,
        ..RateLimitConfig::default()
    };
    let h = harness_with(MockGateway::new(), Some(TOKEN), limits);

    for client in ["203.0.113.1", "203.0.113.2"] {
        let request = Request::get("/api/v1/health")
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&h.app, request).await.0, StatusCode::OK);
    }
}

#[tokio::test]
async fn session_limit_is_stricter_than_api_limit() {
    let limits = RateLimitConfig {
        session_limit: 1,
        ..RateLimitConfig::default()
    };
    let h = harness_with(MockGateway::new(), Some(TOKEN), limits);

    // Missing phone number fails fast but still counts against the limit.
    let first = h.app.clone().oneshot(get("/api/v1/whatsapp/code")).await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);
    assert_eq!(first.headers()["x-ratelimit-limit"], "1");

    let second = h.app.clone().oneshot(get("/api/v1/whatsapp/code")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = h.app.clone().oneshot(get("/api/v1/whatsapp/status")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}
