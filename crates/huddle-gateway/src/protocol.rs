// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON frames exchanged over the duplex connection.
//!
//! Client -> Server:
//! ```json
//! {"action": "setViewState", "channelId": "c1", "state": "monitoring"}
//! {"action": "subscribe", "channelId": "c1"}
//! {"action": "unsubscribe", "channelId": "c1"}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"type": "viewerChanged", "channelId": "c1", "userId": "u1", "state": "editing"}
//! {"type": "MESSAGE_CREATED", "body": {...}}
//! ```

use std::sync::Arc;

use huddle_core::{BotEventType, ChannelId, UserId, ViewState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientAction {
    #[serde(rename_all = "camelCase")]
    SetViewState {
        channel_id: ChannelId,
        #[serde(default)]
        state: ViewState,
    },
    #[serde(rename_all = "camelCase")]
    Subscribe { channel_id: ChannelId },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { channel_id: ChannelId },
}

impl ClientAction {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

pub mod message_types {
    pub const VIEWER_CHANGED: &str = "viewerChanged";
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewerChanged<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channel_id: &'a ChannelId,
    user_id: &'a UserId,
    state: ViewState,
}

#[derive(Serialize)]
struct EventPush<'a> {
    #[serde(rename = "type")]
    kind: BotEventType,
    body: &'a serde_json::Value,
}

pub fn viewer_changed(channel_id: &ChannelId, user_id: &UserId, state: ViewState) -> Arc<str> {
    encode(&ViewerChanged {
        kind: message_types::VIEWER_CHANGED,
        channel_id,
        user_id,
        state,
    })
}

pub fn event_push(kind: BotEventType, body: &serde_json::Value) -> Arc<str> {
    encode(&EventPush { kind, body })
}

fn encode<T: Serialize>(frame: &T) -> Arc<str> {
    // Plain structs of strings and JSON values always serialize.
    match serde_json::to_string(frame) {
        Ok(json) => Arc::from(json),
        Err(e) => {
            tracing::error!("failed to encode push frame: {e}");
            Arc::from("{}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_view_state() {
        let action =
            ClientAction::parse(r#"{"action":"setViewState","channelId":"c1","state":"EDITING"}"#)
                .unwrap();
        assert_eq!(
            action,
            ClientAction::SetViewState {
                channel_id: ChannelId::from("c1"),
                state: ViewState::Editing,
            }
        );
    }

    #[test]
    fn unknown_state_string_is_none() {
        let action =
            ClientAction::parse(r#"{"action":"setViewState","channelId":"c1","state":"typing"}"#)
                .unwrap();
        assert!(matches!(
            action,
            ClientAction::SetViewState {
                state: ViewState::None,
                ..
            }
        ));
    }

    #[test]
    fn missing_state_defaults_to_none() {
        let action = ClientAction::parse(r#"{"action":"setViewState","channelId":"c1"}"#).unwrap();
        assert!(matches!(
            action,
            ClientAction::SetViewState {
                state: ViewState::None,
                ..
            }
        ));
    }

    #[test]
    fn parses_subscription_actions() {
        assert_eq!(
            ClientAction::parse(r#"{"action":"subscribe","channelId":"c9"}"#).unwrap(),
            ClientAction::Subscribe {
                channel_id: ChannelId::from("c9")
            }
        );
        assert_eq!(
            ClientAction::parse(r#"{"action":"unsubscribe","channelId":"c9"}"#).unwrap(),
            ClientAction::Unsubscribe {
                channel_id: ChannelId::from("c9")
            }
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(ClientAction::parse("not json").is_err());
        assert!(ClientAction::parse(r#"{"action":"dance"}"#).is_err());
        assert!(ClientAction::parse(r#"{"action":"subscribe"}"#).is_err());
    }

    #[test]
    fn viewer_changed_shape() {
        let frame = viewer_changed(
            &ChannelId::from("c1"),
            &UserId::from("u1"),
            ViewState::Monitoring,
        );
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "viewerChanged",
                "channelId": "c1",
                "userId": "u1",
                "state": "monitoring"
            })
        );
    }

    #[test]
    fn event_push_shape() {
        let frame = event_push(
            BotEventType::MessageCreated,
            &serde_json::json!({"id": "m1"}),
        );
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "MESSAGE_CREATED", "body": {"id": "m1"}})
        );
    }
}
