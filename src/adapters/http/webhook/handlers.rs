//! HTTP handlers for the chat transport webhook.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use secrecy::{ExposeSecret, Secret};

use crate::application::{FlowRouter, RouterError};
use crate::domain::conversation::IncomingEvent;
use crate::domain::webhook::{verify_token_matches, SignatureVerifier, WebhookError, SIGNATURE_HEADER};
use crate::ports::InputClassifier;

use super::dto::{DeliveryResponse, ErrorResponse, HealthResponse, VerifyQuery};
use super::processed_messages::ProcessedMessages;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state of the webhook endpoints.
#[derive(Clone)]
pub struct WebhookAppState {
    pub router: Arc<FlowRouter>,
    pub classifier: Arc<dyn InputClassifier>,
    /// Absent when signature checking is disabled (local development).
    pub verifier: Option<Arc<SignatureVerifier>>,
    pub verify_token: Arc<Secret<String>>,
    pub processed: Arc<ProcessedMessages>,
}

impl WebhookAppState {
    pub fn new(
        router: Arc<FlowRouter>,
        classifier: Arc<dyn InputClassifier>,
        verify_token: impl Into<String>,
    ) -> Self {
        Self {
            router,
            classifier,
            verifier: None,
            verify_token: Arc::new(Secret::new(verify_token.into())),
            processed: Arc::new(ProcessedMessages::new()),
        }
    }

    pub fn with_app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.verifier = Some(Arc::new(SignatureVerifier::new(app_secret)));
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /webhook - Subscription verification handshake
pub async fn verify_subscription(
    State(state): State<WebhookAppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let token_ok = query
        .verify_token
        .as_deref()
        .is_some_and(|token| verify_token_matches(state.verify_token.expose_secret(), token));

    match (query.mode.as_deref(), query.challenge) {
        (Some("subscribe"), Some(challenge)) if token_ok => {
            tracing::info!("Webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            tracing::warn!(mode = ?query.mode, "Webhook verification rejected");
            WebhookApiError::VerificationFailed.into_response()
        }
    }
}

/// POST /webhook - Inbound message delivery
pub async fn receive_delivery(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    // 1. Authenticate the delivery
    if let Some(verifier) = &state.verifier {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        verifier.verify(&body, signature)?;
    }

    // 2. Parse and classify
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| WebhookApiError::MalformedPayload(e.to_string()))?;
    let events = state.classifier.classify_webhook(&payload);

    // 3. Dispatch in delivery order, detached from the request so a client
    //    timeout cannot drop a session mid-save
    let router = Arc::clone(&state.router);
    let processed = Arc::clone(&state.processed);
    let (response, store_failure) =
        tokio::spawn(async move { dispatch_events(&router, &processed, events).await })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Dispatch task failed");
                WebhookApiError::Dispatch("dispatch task failed".to_string())
            })?;

    // 4. Ask for redelivery if any session could not be persisted
    if let Some(message) = store_failure {
        return Err(WebhookApiError::Dispatch(message));
    }
    Ok((StatusCode::OK, Json(response)))
}

/// Dispatches `events` in order, skipping ids already dispatched by an
/// earlier attempt. Returns the counts and the last store failure, if any.
async fn dispatch_events(
    router: &FlowRouter,
    processed: &ProcessedMessages,
    events: Vec<IncomingEvent>,
) -> (DeliveryResponse, Option<String>) {
    let mut response = DeliveryResponse {
        processed: 0,
        skipped: 0,
    };
    let mut store_failure = None;
    for event in &events {
        if let Some(id) = event.message_id() {
            if processed.contains(id) {
                tracing::debug!(user = %event.sender(), message_id = id, "Skipping redelivered event");
                response.skipped += 1;
                continue;
            }
        }

        match router.dispatch(event).await {
            Ok(report) => {
                tracing::info!(
                    user = %event.sender(),
                    message_id = ?event.message_id(),
                    flow = ?report.flow,
                    step = ?report.step,
                    outcome = ?report.outcome,
                    "Webhook event dispatched"
                );
                if let Some(id) = event.message_id() {
                    processed.mark_processed(id);
                }
                response.processed += 1;
            }
            Err(RouterError::MissingSender) => {
                tracing::warn!(message_id = ?event.message_id(), "Dropping event without sender");
                response.skipped += 1;
            }
            Err(RouterError::Store(e)) => {
                tracing::error!(
                    user = %event.sender(),
                    error = %e,
                    "Session store failed; delivery will be retried"
                );
                store_failure = Some(e.to_string());
            }
        }
    }
    (response, store_failure)
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook failures to HTTP responses.
#[derive(Debug)]
pub enum WebhookApiError {
    Signature(WebhookError),
    VerificationFailed,
    MalformedPayload(String),
    Dispatch(String),
}

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        WebhookApiError::Signature(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            WebhookApiError::Signature(err) => {
                tracing::warn!(error = %err, "Rejected webhook delivery");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("INVALID_SIGNATURE", err.to_string()),
                )
            }
            WebhookApiError::VerificationFailed => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("VERIFICATION_FAILED", "Webhook verification failed"),
            ),
            WebhookApiError::MalformedPayload(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("MALFORMED_PAYLOAD", msg),
            ),
            WebhookApiError::Dispatch(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("DISPATCH_FAILED", msg),
            ),
        };
        (status, Json(error)).into_response()
    }
}
