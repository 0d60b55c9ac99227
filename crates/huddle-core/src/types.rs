// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the connection, viewer and bot components.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::error::HuddleError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a chat user.
    UserId
);
string_id!(
    /// Identifier of a chat channel.
    ChannelId
);
string_id!(
    /// Identifier of a registered bot.
    BotId
);

/// Identifier of a live duplex connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Allocate a fresh random connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-user, per-channel presence indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ViewState {
    /// Channel open in the background, or not open at all.
    #[default]
    None,
    /// Messages of the channel are on screen.
    Monitoring,
    /// The user is composing a message in the channel.
    Editing,
}

impl ViewState {
    /// Decode a wire string, case-insensitively. Unrecognized values map to
    /// [`ViewState::None`] instead of failing.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "monitoring" => Self::Monitoring,
            "editing" => Self::Editing,
            _ => Self::None,
        }
    }
}

impl Serialize for ViewState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for ViewState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// Closed set of domain events a bot can subscribe to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotEventType {
    Ping,
    Joined,
    Left,
    MessageCreated,
    MessageUpdated,
    MessageDeleted,
    DirectMessageCreated,
    ChannelCreated,
    ChannelTopicChanged,
    UserCreated,
    TagAdded,
    TagRemoved,
}

impl BotEventType {
    /// Parse a wire event name such as `MESSAGE_CREATED`.
    pub fn parse(raw: &str) -> Result<Self, HuddleError> {
        raw.parse()
            .map_err(|_| HuddleError::InvalidEventType(raw.to_string()))
    }
}

/// A registered automation agent reached through an HTTP callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    /// Callback URL receiving `POST` deliveries.
    pub post_url: String,
    /// Shared secret echoed in every delivery so the bot can authenticate it.
    pub verification_token: String,
    pub subscribed_events: HashSet<BotEventType>,
    pub active: bool,
}

impl Bot {
    /// Whether this bot should receive `event_type`.
    pub fn wants(&self, event_type: BotEventType) -> bool {
        self.active && self.subscribed_events.contains(&event_type)
    }
}

/// One event prepared for delivery to one bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotEvent {
    pub event_type: BotEventType,
    /// Serialized JSON payload sent as the request body.
    pub payload: String,
    /// Correlation id, unique per delivery attempt.
    pub request_id: Uuid,
}

impl BotEvent {
    /// Build an event with a fresh correlation id.
    pub fn new(event_type: BotEventType, payload: impl Into<String>) -> Self {
        Self {
            event_type,
            payload: payload.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Outcome class of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize)]
pub enum DeliveryResult {
    /// The bot answered `204 No Content`.
    #[strum(serialize = "OK")]
    #[serde(rename = "OK")]
    Ok,
    /// The bot answered with any other status.
    #[strum(serialize = "NG")]
    #[serde(rename = "NG")]
    Ng,
    /// No response was received.
    NetworkError,
}

/// Immutable record of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotEventLog {
    pub request_id: Uuid,
    pub bot_id: BotId,
    pub event: BotEventType,
    pub body: String,
    pub result: DeliveryResult,
    /// Transport error text, only set for [`DeliveryResult::NetworkError`].
    pub error: Option<String>,
    /// HTTP status code, or `-1` when no response arrived.
    pub code: i32,
    pub latency_ns: u64,
    pub date_time: DateTime<Utc>,
}

impl BotEventLog {
    /// Status code recorded when no HTTP response was received.
    pub const NO_RESPONSE_CODE: i32 = -1;

    /// Whether the attempt counts as a success.
    pub fn is_ok(&self) -> bool {
        self.result == DeliveryResult::Ok
    }
}

/// Which live connections a domain event should reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum EventScope {
    /// Every connection subscribed to the channel.
    Channel(ChannelId),
    /// Every connection owned by any of the listed users.
    Users(Vec<UserId>),
    /// Every live connection.
    All,
}

/// A state change produced by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub kind: BotEventType,
    pub scope: EventScope,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn view_state_decodes_case_insensitively() {
        assert_eq!(ViewState::parse_lenient("EDITING"), ViewState::Editing);
        assert_eq!(ViewState::parse_lenient("Monitoring"), ViewState::Monitoring);
        assert_eq!(ViewState::parse_lenient("none"), ViewState::None);
    }

    #[test]
    fn unknown_view_state_maps_to_none() {
        assert_eq!(ViewState::parse_lenient("typing"), ViewState::None);
        assert_eq!(ViewState::parse_lenient(""), ViewState::None);
        let state: ViewState = serde_json::from_str(r#""sleeping""#).unwrap();
        assert_eq!(state, ViewState::None);
    }

    proptest::proptest! {
        #[test]
        fn lenient_decode_is_total(raw in "\\PC{0,16}") {
            let state = ViewState::parse_lenient(&raw);
            let lowered = raw.to_ascii_lowercase();
            if lowered != "monitoring" && lowered != "editing" {
                proptest::prop_assert_eq!(state, ViewState::None);
            }
        }
    }

    #[test]
    fn view_state_serializes_lowercase() {
        let json = serde_json::to_string(&ViewState::Editing).unwrap();
        assert_eq!(json, r#""editing""#);
    }

    #[test]
    fn bot_event_type_names() {
        assert_eq!(BotEventType::MessageCreated.to_string(), "MESSAGE_CREATED");
        assert_eq!(
            BotEventType::from_str("CHANNEL_TOPIC_CHANGED").unwrap(),
            BotEventType::ChannelTopicChanged
        );
        assert!(BotEventType::from_str("MESSAGE_STAMPED").is_err());
        assert_eq!(BotEventType::parse("TAG_ADDED").unwrap(), BotEventType::TagAdded);
        assert!(matches!(
            BotEventType::parse("message_created"),
            Err(HuddleError::InvalidEventType(name)) if name == "message_created"
        ));
        for variant in BotEventType::iter() {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, format!("\"{variant}\""));
        }
    }

    #[test]
    fn delivery_result_labels() {
        assert_eq!(DeliveryResult::Ok.as_ref(), "OK");
        assert_eq!(DeliveryResult::Ng.as_ref(), "NG");
        assert_eq!(DeliveryResult::NetworkError.as_ref(), "NetworkError");
    }

    #[test]
    fn inactive_bot_wants_nothing() {
        let mut bot = Bot {
            id: BotId::from("b1"),
            post_url: "http://localhost/hook".into(),
            verification_token: "t".into(),
            subscribed_events: [BotEventType::MessageCreated].into_iter().collect(),
            active: true,
        };
        assert!(bot.wants(BotEventType::MessageCreated));
        assert!(!bot.wants(BotEventType::Joined));
        bot.active = false;
        assert!(!bot.wants(BotEventType::MessageCreated));
    }

    #[test]
    fn bot_events_get_distinct_request_ids() {
        let a = BotEvent::new(BotEventType::Ping, "{}");
        let b = BotEvent::new(BotEventType::Ping, "{}");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn event_scope_wire_shape() {
        let scope = EventScope::Channel(ChannelId::from("c1"));
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "channel", "target": "c1"}));
    }
}
