// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `huddle serve` command implementation.
//!
//! Wires the bot registry, dispatcher, connection registry and event hub
//! from configuration, then serves the gateway until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Instant;

use huddle_bot::{BotDispatcher, BotRegistry, DispatcherConfig, MemoryLogStore};
use huddle_config::model::BotEntryConfig;
use huddle_config::HuddleConfig;
use huddle_core::{HuddleError, UserId};
use huddle_gateway::server::start_server;
use huddle_gateway::{
    AuthConfig, ConnectionRegistry, EventHub, GatewayState, HealthState, HeartbeatConfig,
    ServerConfig, SessionConfig, TokenSessions,
};
use huddle_prometheus::PrometheusAdapter;
use tracing::{info, warn};

use crate::shutdown;

type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Runs the `huddle serve` command.
pub async fn run_serve(config: HuddleConfig) -> Result<(), HuddleError> {
    init_tracing(&config.server.log_level);

    let prometheus_render: Option<RenderFn> = match PrometheusAdapter::new() {
        Ok(adapter) => {
            let adapter = Arc::new(adapter);
            Some(Arc::new(move || adapter.render()))
        }
        Err(e) => {
            warn!("metrics disabled: {e}");
            None
        }
    };

    let state = build_state(&config, prometheus_render)?;
    if state.auth.bearer_token.is_none() {
        warn!("no server.bearer_token configured; /v1 API will reject every request");
    }
    info!(
        bots = state.hub.dispatcher().registry().len(),
        queue_capacity = config.websocket.queue_capacity,
        "realtime hub ready"
    );

    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server_config, state, async move {
        cancel.cancelled().await;
    })
    .await?;

    info!("huddle serve shutdown complete");
    Ok(())
}

/// Build the shared gateway state from configuration.
pub fn build_state(
    config: &HuddleConfig,
    prometheus_render: Option<RenderFn>,
) -> Result<GatewayState, HuddleError> {
    let log_store = Arc::new(MemoryLogStore::new(config.bot.log_capacity));
    let bots = BotRegistry::from_bots(config.bots.iter().map(BotEntryConfig::to_bot));
    let dispatcher = BotDispatcher::new(
        DispatcherConfig {
            timeout: config.bot.timeout(),
            user_agent: config.bot.user_agent.clone(),
        },
        Arc::new(bots),
        log_store.clone(),
    )?;

    let session = SessionConfig {
        heartbeat: HeartbeatConfig {
            ping_period: config.websocket.ping_period(),
            pong_wait: config.websocket.pong_wait(),
            write_wait: config.websocket.write_wait(),
        },
        max_frame_bytes: config.websocket.max_frame_bytes,
    };
    let hub = Arc::new(EventHub::new(
        Arc::new(ConnectionRegistry::new(config.websocket.queue_capacity)),
        dispatcher,
        session,
    ));

    let sessions: TokenSessions = config
        .sessions
        .iter()
        .map(|(token, user)| (token.clone(), UserId::from(user.as_str())))
        .collect();

    Ok(GatewayState {
        hub,
        sessions: Arc::new(sessions),
        log_store,
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: Instant::now(),
            prometheus_render,
        },
    })
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("huddle={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::{BotEventType, BotId, SessionResolver};

    const CONFIG: &str = r#"
        [server]
        bearer_token = "api"

        [websocket]
        queue_capacity = 8
        max_frame_bytes = 1024
        pong_wait_secs = 30
        ping_period_secs = 20

        [[bots]]
        id = "echo"
        post_url = "http://127.0.0.1:9/hook"
        verification_token = "v"
        events = ["MESSAGE_CREATED"]

        [sessions]
        tok = "alice"
    "#;

    #[tokio::test]
    async fn state_reflects_config() {
        let config = huddle_config::load_and_validate_str(CONFIG).unwrap();
        let state = build_state(&config, None).unwrap();

        let session = state.hub.session_config();
        assert_eq!(session.max_frame_bytes, 1024);
        assert_eq!(session.heartbeat.pong_wait.as_secs(), 30);
        assert_eq!(session.heartbeat.ping_period.as_secs(), 20);

        let bots = state.hub.dispatcher().registry();
        assert_eq!(bots.len(), 1);
        assert!(bots.get(&BotId::from("echo")).unwrap().wants(BotEventType::MessageCreated));

        assert_eq!(state.sessions.resolve("tok").await, Some(UserId::from("alice")));
        assert_eq!(state.auth.bearer_token.as_deref(), Some("api"));
    }
}
