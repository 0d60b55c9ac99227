// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles POST /v1/events, GET /v1/channels/{channel_id}/viewers,
//! GET /v1/connections, POST /v1/bots/{bot_id}/ping,
//! GET /v1/bots/{bot_id}/logs, and the public /health and /metrics.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use huddle_core::{
    BotEventLog, BotEventLogStore, BotEventType, BotId, ChannelId, DomainEvent, EventScope,
    HuddleError, UserId,
};
use serde::{Deserialize, Serialize};

use crate::registry::ConnectionStats;
use crate::server::GatewayState;
use crate::viewer::ViewerEntry;

/// Request body for POST /v1/events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Event name such as `MESSAGE_CREATED`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Push to subscribers of this channel.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    /// Push to every connection of these users.
    #[serde(default)]
    pub user_ids: Option<Vec<UserId>>,
    #[serde(default)]
    pub body: serde_json::Value,
    /// Wait for bot deliveries and report them.
    #[serde(default)]
    pub wait: bool,
}

impl PublishRequest {
    /// Channel takes precedence over users; neither means everyone.
    pub fn into_event(self) -> Result<DomainEvent, HuddleError> {
        let kind = BotEventType::parse(&self.kind)?;
        let scope = match (self.channel_id, self.user_ids) {
            (Some(channel_id), _) => EventScope::Channel(channel_id),
            (None, Some(user_ids)) => EventScope::Users(user_ids),
            (None, None) => EventScope::All,
        };
        Ok(DomainEvent {
            kind,
            scope,
            payload: self.body,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliveries: Option<Vec<BotEventLog>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewersResponse {
    pub channel_id: ChannelId,
    pub viewers: Vec<ViewerEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionStats>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connections: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/events
///
/// Publishes a domain event. Returns 202 with the push fan-out count, or
/// 200 with the delivery logs when `wait` is set. Unknown event names are
/// rejected with 400.
pub async fn post_events(
    State(state): State<GatewayState>,
    Json(body): Json<PublishRequest>,
) -> Response {
    let wait = body.wait;
    let event = match body.into_event() {
        Ok(event) => event,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    if wait {
        let report = state.hub.publish_and_wait(event).await;
        (
            StatusCode::OK,
            Json(PublishResponse {
                connections: report.connections,
                deliveries: Some(report.deliveries),
            }),
        )
            .into_response()
    } else {
        let connections = state.hub.publish(event);
        (
            StatusCode::ACCEPTED,
            Json(PublishResponse {
                connections,
                deliveries: None,
            }),
        )
            .into_response()
    }
}

/// GET /v1/channels/{channel_id}/viewers
pub async fn get_channel_viewers(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
) -> Json<ViewersResponse> {
    let channel_id = ChannelId::from(channel_id);
    let viewers = state.hub.viewers().get_snapshot(&channel_id);
    Json(ViewersResponse {
        channel_id,
        viewers,
    })
}

/// GET /v1/connections
pub async fn get_connections(State(state): State<GatewayState>) -> Json<ConnectionsResponse> {
    Json(ConnectionsResponse {
        connections: state.hub.registry().stats(),
    })
}

/// POST /v1/bots/{bot_id}/ping
pub async fn post_bot_ping(
    State(state): State<GatewayState>,
    Path(bot_id): Path<String>,
) -> Response {
    match state.hub.dispatcher().ping(&BotId::from(bot_id)).await {
        Ok((_, log)) => (StatusCode::OK, Json(log)).into_response(),
        Err(e @ HuddleError::NotFound { .. }) => error_response(StatusCode::NOT_FOUND, e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// GET /v1/bots/{bot_id}/logs?limit=N
///
/// Most recent delivery attempts for a bot, newest first.
pub async fn get_bot_logs(
    State(state): State<GatewayState>,
    Path(bot_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let bot_id = BotId::from(bot_id);
    if let Err(e) = state.hub.dispatcher().registry().get(&bot_id) {
        return error_response(StatusCode::NOT_FOUND, e);
    }
    match state.log_store.recent(&bot_id, query.limit).await {
        Ok(logs) => (StatusCode::OK, Json(logs)).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        connections: state.hub.registry().len(),
    })
}

/// GET /metrics (unauthenticated)
///
/// Prometheus text exposition; 404 when no recorder is installed.
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_request_scopes() {
        let req: PublishRequest = serde_json::from_str(
            r#"{"type":"MESSAGE_CREATED","channelId":"c1","userIds":["u1"],"body":{"id":"m"}}"#,
        )
        .unwrap();
        assert!(!req.wait);
        let event = req.into_event().unwrap();
        assert_eq!(event.kind, BotEventType::MessageCreated);
        assert_eq!(event.scope, EventScope::Channel(ChannelId::from("c1")));
        assert_eq!(event.payload, serde_json::json!({"id": "m"}));

        let req: PublishRequest =
            serde_json::from_str(r#"{"type":"TAG_ADDED","userIds":["u1","u2"]}"#).unwrap();
        assert_eq!(
            req.into_event().unwrap().scope,
            EventScope::Users(vec![UserId::from("u1"), UserId::from("u2")])
        );

        let req: PublishRequest = serde_json::from_str(r#"{"type":"USER_CREATED"}"#).unwrap();
        let event = req.into_event().unwrap();
        assert_eq!(event.scope, EventScope::All);
        assert_eq!(event.payload, serde_json::Value::Null);
    }

    #[test]
    fn publish_request_rejects_unknown_type() {
        let req: PublishRequest = serde_json::from_str(r#"{"type":"STAMP_ADDED"}"#).unwrap();
        let err = req.into_event().unwrap_err();
        assert!(matches!(err, HuddleError::InvalidEventType(ref name) if name == "STAMP_ADDED"));
        assert_eq!(err.to_string(), "unsupported event type `STAMP_ADDED`");
    }

    #[test]
    fn publish_response_omits_missing_deliveries() {
        let json = serde_json::to_string(&PublishResponse {
            connections: 2,
            deliveries: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"connections":2}"#);
    }

    #[test]
    fn logs_query_default_limit() {
        let q: LogsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, 50);
    }
}
