//! Integration tests for the webhook HTTP endpoints.
//!
//! These tests drive the axum router in-process:
//! 1. Subscription handshake accepts only the configured token
//! 2. Signed deliveries are classified and dispatched in order
//! 3. Store failures surface as 500 so the transport redelivers
//! 4. Redelivered envelopes only replay the events that failed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::timeout::TimeoutLayer;

use marketplace_bot::adapters::{
    webhook_router, InMemoryMarketplace, InMemorySessionStore, RecordingMessenger,
    WebhookAppState, WhatsAppClassifier,
};
use marketplace_bot::application::{default_registry, FlowRouter, MarketplaceServices};
use marketplace_bot::domain::conversation::{ConversationSession, FlowName};
use marketplace_bot::domain::foundation::UserIdentifier;
use marketplace_bot::domain::webhook::{sign_payload, SIGNATURE_HEADER};
use marketplace_bot::ports::{OutboundMessage, SessionStore, SessionStoreError};

// =============================================================================
// Test Infrastructure
// =============================================================================

const VERIFY_TOKEN: &str = "verify-me";
const APP_SECRET: &str = "app-secret";
const USER: &str = "6281234567890";

struct TestApp {
    app: Router,
    store: Arc<InMemorySessionStore>,
    messenger: Arc<RecordingMessenger>,
}

fn build_app(store: Arc<dyn SessionStore>, app_secret: Option<&str>) -> (Router, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::new());
    let services = MarketplaceServices::from_backend(Arc::new(InMemoryMarketplace::new()));
    let router = FlowRouter::new(default_registry(&services), store, messenger.clone());

    let mut state = WebhookAppState::new(
        Arc::new(router),
        Arc::new(WhatsAppClassifier::new()),
        VERIFY_TOKEN,
    );
    if let Some(secret) = app_secret {
        state = state.with_app_secret(secret);
    }
    (webhook_router(state), messenger)
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemorySessionStore::new());
    let (app, messenger) = build_app(store.clone(), Some(APP_SECRET));
    TestApp {
        app,
        store,
        messenger,
    }
}

/// Session store whose backing storage is down.
struct UnavailableStore;

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn load(&self, _user: &UserIdentifier) -> Result<ConversationSession, SessionStoreError> {
        Err(SessionStoreError::Unavailable("disk detached".to_string()))
    }

    async fn save(&self, _session: &ConversationSession) -> Result<(), SessionStoreError> {
        Err(SessionStoreError::Unavailable("disk detached".to_string()))
    }
}

/// In-memory store that fails the first save for one user.
struct FlakyStore {
    inner: InMemorySessionStore,
    failing_user: UserIdentifier,
    armed: AtomicBool,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn load(&self, user: &UserIdentifier) -> Result<ConversationSession, SessionStoreError> {
        self.inner.load(user).await
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError> {
        if session.user_identifier() == &self.failing_user && self.armed.swap(false, Ordering::SeqCst) {
            return Err(SessionStoreError::Unavailable("write rejected".to_string()));
        }
        self.inner.save(session).await
    }
}

/// In-memory store with slow writes.
struct SlowStore {
    inner: Arc<InMemorySessionStore>,
    delay: Duration,
}

#[async_trait]
impl SessionStore for SlowStore {
    async fn load(&self, user: &UserIdentifier) -> Result<ConversationSession, SessionStoreError> {
        self.inner.load(user).await
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), SessionStoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(session).await
    }
}

fn delivery(messages: Vec<Value>) -> Vec<u8> {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA-1",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": { "phone_number_id": "1098765" },
                    "messages": messages
                }
            }]
        }]
    })
    .to_string()
    .into_bytes()
}

fn text_message(from: &str, id: &str, body: &str) -> Value {
    json!({ "from": from, "id": id, "type": "text", "text": { "body": body } })
}

fn signed_post(body: Vec<u8>) -> Request<Body> {
    Request::post("/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, sign_payload(APP_SECRET, &body))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Subscription handshake
// =============================================================================

#[tokio::test]
async fn handshake_echoes_challenge_for_matching_token() {
    let t = test_app();

    let response = t
        .app
        .oneshot(
            Request::get(format!(
                "/webhook?hub.mode=subscribe&hub.verify_token={}&hub.challenge=1158201444",
                VERIFY_TOKEN
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"1158201444");
}

#[tokio::test]
async fn handshake_rejects_wrong_token() {
    let t = test_app();

    let response = t
        .app
        .oneshot(
            Request::get("/webhook?hub.mode=subscribe&hub.verify_token=guess&hub.challenge=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error_code"], "VERIFICATION_FAILED");
}

// =============================================================================
// Deliveries
// =============================================================================

#[tokio::test]
async fn signed_delivery_opens_main_menu() {
    let t = test_app();
    let body = delivery(vec![text_message(USER, "wamid.1", "hi")]);

    let response = t.app.oneshot(signed_post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["processed"], 1);
    assert_eq!(payload["skipped"], 0);

    let session = t.store.get(&UserIdentifier::new(USER)).await.unwrap();
    assert_eq!(session.current_flow(), Some(FlowName::MainMenu));
    assert!(matches!(
        t.messenger.last().map(|m| m.message),
        Some(OutboundMessage::List { .. })
    ));
}

#[tokio::test]
async fn messages_in_one_delivery_are_dispatched_in_order() {
    let t = test_app();
    let body = delivery(vec![
        text_message(USER, "wamid.1", "hi"),
        json!({
            "from": USER,
            "id": "wamid.2",
            "type": "interactive",
            "interactive": {
                "type": "list_reply",
                "list_reply": { "id": "flash_deal_create", "title": "Flash deal" }
            }
        }),
    ]);

    let response = t.app.oneshot(signed_post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session = t.store.get(&UserIdentifier::new(USER)).await.unwrap();
    assert_eq!(session.current_flow(), Some(FlowName::FlashDealCreate));
    assert_eq!(session.current_step(), Some("ask_title"));
}

#[tokio::test]
async fn messages_without_sender_are_skipped() {
    let t = test_app();
    let body = delivery(vec![json!({ "id": "wamid.9", "type": "text", "text": { "body": "hi" } })]);

    let response = t.app.oneshot(signed_post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["processed"], 0);
    assert_eq!(payload["skipped"], 1);
    assert_eq!(t.store.session_count().await, 0);
}

#[tokio::test]
async fn status_callbacks_are_acknowledged() {
    let t = test_app();
    let body = json!({
        "object": "whatsapp_business_account",
        "entry": [{ "changes": [{ "value": { "statuses": [{ "id": "wamid.1", "status": "read" }] } }] }]
    })
    .to_string()
    .into_bytes();

    let response = t.app.oneshot(signed_post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["processed"], 0);
    assert!(t.messenger.sent().is_empty());
}

#[tokio::test]
async fn tampered_delivery_is_unauthorized() {
    let t = test_app();
    let body = delivery(vec![text_message(USER, "wamid.1", "hi")]);
    let signature = sign_payload(APP_SECRET, b"something else");

    let response = t
        .app
        .oneshot(
            Request::post("/webhook")
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error_code"], "INVALID_SIGNATURE");
    assert_eq!(t.store.session_count().await, 0);
}

#[tokio::test]
async fn unsigned_delivery_is_unauthorized_when_secret_configured() {
    let t = test_app();
    let body = delivery(vec![text_message(USER, "wamid.1", "hi")]);

    let response = t
        .app
        .oneshot(Request::post("/webhook").body(Body::from(body)).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unsigned_delivery_accepted_without_secret() {
    let store = Arc::new(InMemorySessionStore::new());
    let (app, _messenger) = build_app(store.clone(), None);
    let body = delivery(vec![text_message(USER, "wamid.1", "hi")]);

    let response = app
        .oneshot(Request::post("/webhook").body(Body::from(body)).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let t = test_app();

    let response = t
        .app
        .oneshot(signed_post(b"{not json".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error_code"], "MALFORMED_PAYLOAD");
}

#[tokio::test]
async fn store_failure_requests_redelivery() {
    let (app, messenger) = build_app(Arc::new(UnavailableStore), Some(APP_SECRET));
    let body = delivery(vec![text_message(USER, "wamid.1", "hi")]);

    let response = app.oneshot(signed_post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error_code"], "DISPATCH_FAILED");
    assert!(messenger.sent().is_empty());
}

#[tokio::test]
async fn redelivery_skips_events_already_dispatched() {
    const OTHER: &str = "6289999999999";
    let store = Arc::new(FlakyStore {
        inner: InMemorySessionStore::new(),
        failing_user: UserIdentifier::new(OTHER),
        armed: AtomicBool::new(true),
    });
    let (app, messenger) = build_app(store.clone(), Some(APP_SECRET));
    let body = delivery(vec![
        text_message(USER, "wamid.1", "hi"),
        text_message(OTHER, "wamid.2", "hi"),
    ]);

    let first = app.clone().oneshot(signed_post(body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(messenger.sent_to(&UserIdentifier::new(USER)).len(), 1);

    let second = app.oneshot(signed_post(body)).await.unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    let payload = json_body(second).await;
    assert_eq!(payload["processed"], 1);
    assert_eq!(payload["skipped"], 1);
    // The menu is not sent again to the user whose event already went through
    assert_eq!(messenger.sent_to(&UserIdentifier::new(USER)).len(), 1);
    let other = store.inner.get(&UserIdentifier::new(OTHER)).await.unwrap();
    assert_eq!(other.current_flow(), Some(FlowName::MainMenu));
}

#[tokio::test]
async fn request_timeout_does_not_cut_dispatch_short() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let store = Arc::new(SlowStore {
        inner: sessions.clone(),
        delay: Duration::from_millis(200),
    });
    let (app, _messenger) = build_app(store, Some(APP_SECRET));
    let app = app.layer(TimeoutLayer::new(Duration::from_millis(20)));
    let body = delivery(vec![text_message(USER, "wamid.1", "hi")]);

    let response = app.oneshot(signed_post(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let session = sessions.get(&UserIdentifier::new(USER)).await.unwrap();
    assert_eq!(session.current_flow(), Some(FlowName::MainMenu));
    assert_eq!(session.current_step(), Some("awaiting_selection"));
}

#[tokio::test]
async fn health_reports_ok() {
    let t = test_app();

    let response = t
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
