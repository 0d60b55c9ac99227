// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use huddle_core::{BotEventLogStore, HuddleError, SessionResolver};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;
use crate::hub::EventHub;
use crate::ws;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Arc<EventHub>,
    /// Resolves handshake credentials to users.
    pub sessions: Arc<dyn SessionResolver>,
    /// Read side of the bot delivery log.
    pub log_store: Arc<dyn BotEventLogStore>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors `ServerConfig` from huddle-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router:
/// - GET /health, GET /metrics (no auth)
/// - POST /v1/events, GET /v1/channels/{channel_id}/viewers,
///   GET /v1/connections, POST /v1/bots/{bot_id}/ping,
///   GET /v1/bots/{bot_id}/logs (bearer auth)
/// - GET /ws (session credential checked during the handshake)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/events", post(handlers::post_events))
        .route(
            "/v1/channels/{channel_id}/viewers",
            get(handlers::get_channel_viewers),
        )
        .route("/v1/connections", get(handlers::get_connections))
        .route("/v1/bots/{bot_id}/ping", post(handlers::post_bot_ping))
        .route("/v1/bots/{bot_id}/logs", get(handlers::get_bot_logs))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind to the configured address and serve until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HuddleError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| HuddleError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");
    serve(listener, state, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves, then close
/// every live connection.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HuddleError> {
    let hub = state.hub.clone();
    let app = router(state);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            // Sessions only end once their queue closes; do it before
            // axum waits for in-flight connections.
            hub.close_all();
        })
        .await
        .map_err(|e| HuddleError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        });

    tracing::info!("Gateway server stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
