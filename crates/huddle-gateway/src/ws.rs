// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket upgrade handler.
//!
//! The handshake is rejected with 401 unless the request carries a session
//! credential that resolves to a user. Accepted sockets are registered with
//! the hub and driven by [`run_session`](crate::session::run_session).

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use futures::StreamExt;
use huddle_core::SessionResolver;
use serde::Deserialize;

use crate::auth::handshake_credential;
use crate::server::GatewayState;
use crate::session::run_session;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    Query(params): Query<WsParams>,
) -> Response {
    let bearer = bearer.map(|TypedHeader(auth)| auth);
    let Some(credential) = handshake_credential(bearer.as_ref(), &jar, params.token.as_deref())
    else {
        tracing::debug!("websocket handshake without credential");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(user_id) = state.sessions.resolve(&credential).await else {
        tracing::debug!("websocket handshake with unknown credential");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let hub = state.hub.clone();
    let max_frame_bytes = hub.session_config().max_frame_bytes;
    ws.max_message_size(max_frame_bytes)
        .max_frame_size(max_frame_bytes)
        .on_upgrade(move |socket| async move {
            let connection = hub.connect(user_id);
            let (sink, stream) = socket.split();
            run_session(sink, stream, connection, hub).await;
        })
}
