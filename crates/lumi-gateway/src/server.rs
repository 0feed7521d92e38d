// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Everything lives under
//! `/api/v1`; health and webhook are public, session control and the chat
//! registry require the bearer token. The API-wide limiter wraps every
//! route, and the stricter session limiter additionally guards linking.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use lumi_agent::{ConnectivityOrchestrator, ConversationEngine, TaskPool};
use lumi_config::model::{GatewayConfig, RateLimitConfig};
use lumi_core::{ChatStore, GatewayClient, LumiError};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::rate_limit::{RateLimitPolicy, rate_limit_middleware};
use crate::{chats, health, webhook, whatsapp};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConnectivityOrchestrator>,
    pub engine: Arc<ConversationEngine>,
    pub store: Arc<dyn ChatStore>,
    pub gateway: Arc<dyn GatewayClient>,
    pub tasks: TaskPool,
    /// Cancelled on shutdown; aborts in-progress session polls.
    pub shutdown: CancellationToken,
}

/// Assembles the full route tree.
pub fn build_router(state: AppState, gateway: &GatewayConfig, limits: &RateLimitConfig) -> Router {
    let window = Duration::from_secs(limits.window_secs);
    let api_policy = RateLimitPolicy::new(limits.api_limit, window);
    let session_policy = RateLimitPolicy::new(limits.session_limit, window);
    let auth = AuthConfig {
        bearer_token: gateway.bearer_token.clone(),
    };

    let linking_routes = Router::new()
        .route("/connect", get(whatsapp::connect))
        .route("/code", get(whatsapp::request_code))
        .route_layer(axum_middleware::from_fn_with_state(
            session_policy,
            rate_limit_middleware,
        ));

    let whatsapp_routes = Router::new()
        .route("/start", post(whatsapp::start))
        .route("/restart", post(whatsapp::restart))
        .route("/stop", post(whatsapp::stop))
        .route("/me", get(whatsapp::me))
        .route("/status", get(whatsapp::status))
        .route("/send/text", post(whatsapp::send_text))
        .route("/send/image", post(whatsapp::send_image))
        .merge(linking_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            auth.clone(),
            auth_middleware,
        ));

    let chat_routes = Router::new()
        .route("/remote/chats", get(chats::remote_chats))
        .route("/remote/groups", get(chats::remote_groups))
        .route("/registered", get(chats::registered))
        .route("/register", post(chats::register))
        .route("/register/{chat_id}", delete(chats::unregister))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware));

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/webhook", post(webhook::webhook))
        .nest("/whatsapp", whatsapp_routes)
        .nest("/chats", chat_routes)
        .layer(axum_middleware::from_fn_with_state(
            api_policy,
            rate_limit_middleware,
        ));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `host:port` and serves `app` until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), LumiError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LumiError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| LumiError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
