// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime gateway: duplex client connections, channel viewer presence,
//! and the HTTP surface that publishes domain events.
//!
//! Every authenticated connection gets a bounded outbound queue and a
//! session of three tasks (reader, writer, heartbeat). Domain events
//! published through the [`EventHub`] fan out to the connections in scope
//! and to subscribed bots.

pub mod auth;
pub mod handlers;
pub mod heartbeat;
pub mod hub;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod server;
pub mod session;
pub mod viewer;
pub mod ws;

pub use auth::{AuthConfig, TokenSessions};
pub use heartbeat::HeartbeatConfig;
pub use hub::{CloseReason, EventHub, PublishReport, SessionConfig};
pub use registry::{ClosedConnection, Connection, ConnectionRegistry, EnqueueOutcome};
pub use server::{GatewayState, HealthState, ServerConfig};
pub use viewer::{ViewerEntry, ViewerTracker};
