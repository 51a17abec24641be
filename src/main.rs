//! Marketplace Bot server - receives chat webhooks and drives the flows.

use std::sync::Arc;
use std::time::Duration;

use marketplace_bot::adapters::{
    webhook_router, CloudApiMessenger, FileSessionStore, InMemoryMarketplace,
    InMemorySessionStore, RecordingMessenger, WebhookAppState, WhatsAppClassifier,
};
use marketplace_bot::application::{default_registry, FlowRouter, MarketplaceServices};
use marketplace_bot::config::{AppConfig, SessionBackend};
use marketplace_bot::ports::{Messenger, SessionStore};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    // Session store
    let store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::File => {
            tokio::fs::create_dir_all(&config.session.store_path).await?;
            tracing::info!(path = %config.session.store_path.display(), "Using file session store");
            Arc::new(FileSessionStore::new(&config.session.store_path))
        }
        SessionBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Arc::new(InMemorySessionStore::new())
        }
    };

    // Outbound transport
    let messenger: Arc<dyn Messenger> = match config.whatsapp.cloud_api_config() {
        Some(api) => Arc::new(CloudApiMessenger::new(api)?),
        None => {
            tracing::warn!("No WhatsApp access token configured; outbound messages are only recorded");
            Arc::new(RecordingMessenger::new())
        }
    };

    // Marketplace services
    let services = MarketplaceServices::from_backend(Arc::new(InMemoryMarketplace::new()));
    let registry = default_registry(&services);
    tracing::info!(flows = ?registry.flows(), "Flow registry initialized");

    let router = FlowRouter::new(registry, store, messenger)
        .with_config(config.session.router_config());

    let mut state = WebhookAppState::new(
        Arc::new(router),
        Arc::new(WhatsAppClassifier::new()),
        config.whatsapp.verify_token.clone(),
    );
    match config.whatsapp.app_secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => state = state.with_app_secret(secret),
        None => tracing::warn!("Webhook signature verification disabled"),
    }

    let app = webhook_router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, environment = ?config.server.environment, "Marketplace bot listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.log_level.clone().into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
