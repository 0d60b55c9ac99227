// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Huddle gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use huddle_core::{Bot, BotEventType, BotId};
use serde::{Deserialize, Serialize};

/// Top-level Huddle configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HuddleConfig {
    /// HTTP listener and internal API settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Duplex connection limits and heartbeat timing.
    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Outbound bot delivery settings.
    #[serde(default)]
    pub bot: BotDeliveryConfig,

    /// Bots registered at startup.
    #[serde(default)]
    pub bots: Vec<BotEntryConfig>,

    /// Session token -> user id map seeded into the session resolver.
    #[serde(default)]
    pub sessions: BTreeMap<String, String>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token guarding the internal `/v1` API. `None` rejects every call.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Duplex connection limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebSocketConfig {
    /// Outbound messages buffered per connection before the oldest is dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Seconds without a pong before the connection is closed.
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,

    /// Seconds between pings. Must be shorter than `pong_wait_secs`.
    #[serde(default = "default_ping_period_secs")]
    pub ping_period_secs: u64,

    /// Seconds a single frame write may take.
    #[serde(default = "default_write_wait_secs")]
    pub write_wait_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
            pong_wait_secs: default_pong_wait_secs(),
            ping_period_secs: default_ping_period_secs(),
            write_wait_secs: default_write_wait_secs(),
        }
    }
}

impl WebSocketConfig {
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.ping_period_secs)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    512
}

fn default_pong_wait_secs() -> u64 {
    60
}

// 9/10 of the pong wait.
fn default_ping_period_secs() -> u64 {
    default_pong_wait_secs() * 9 / 10
}

fn default_write_wait_secs() -> u64 {
    5
}

/// Outbound bot delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotDeliveryConfig {
    /// Hard timeout for one delivery attempt, in seconds.
    #[serde(default = "default_bot_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` sent with every delivery.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Number of delivery records kept by the in-memory log store.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for BotDeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_bot_timeout_secs(),
            user_agent: default_user_agent(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl BotDeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bot_timeout_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    "Huddle_Bot_Processor/1.0".to_string()
}

fn default_log_capacity() -> usize {
    10_000
}

/// One bot registered at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotEntryConfig {
    /// Unique bot identifier.
    pub id: String,

    /// Callback URL receiving deliveries.
    pub post_url: String,

    /// Shared secret sent in the token header.
    pub verification_token: String,

    /// Subscribed event names, e.g. `MESSAGE_CREATED`.
    #[serde(default)]
    pub events: Vec<BotEventType>,

    /// Inactive bots are registered but never receive deliveries.
    #[serde(default = "default_bot_active")]
    pub active: bool,
}

fn default_bot_active() -> bool {
    true
}

impl BotEntryConfig {
    /// Convert into the registry's [`Bot`] value.
    pub fn to_bot(&self) -> Bot {
        Bot {
            id: BotId(self.id.clone()),
            post_url: self.post_url.clone(),
            verification_token: self.verification_token.clone(),
            subscribed_events: self.events.iter().copied().collect::<HashSet<_>>(),
            active: self.active,
        }
    }
}
