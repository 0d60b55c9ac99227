// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event hub: the single entry point the rest of the system talks to.
//!
//! Domain events published here are pushed to the live connections in the
//! event's scope and handed to the bot dispatcher. Client frames read by a
//! connection session are applied here, and so is disconnect cleanup.

use std::sync::Arc;

use huddle_bot::BotDispatcher;
use huddle_core::{BotEventLog, ChannelId, ConnectionId, DomainEvent, EventScope, UserId};
use serde::Serialize;
use strum::{AsRefStr, Display};
use tracing::{debug, info};

use crate::heartbeat::HeartbeatConfig;
use crate::protocol::{self, ClientAction};
use crate::registry::{Connection, ConnectionRegistry, EnqueueOutcome};
use crate::viewer::ViewerTracker;

/// Why a connection session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CloseReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// No pong within the pong window.
    HeartbeatTimeout,
    /// A write did not complete within the write window.
    WriteTimeout,
    WriteFailed,
    ReadFailed,
    /// The connection was unregistered from the server side.
    QueueClosed,
}

/// Session limits applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat: HeartbeatConfig,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatConfig::default(),
            max_frame_bytes: 512,
        }
    }
}

/// Result of [`EventHub::publish_and_wait`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    /// Live connections the push reached.
    pub connections: usize,
    pub deliveries: Vec<BotEventLog>,
}

pub struct EventHub {
    registry: Arc<ConnectionRegistry>,
    viewers: ViewerTracker,
    dispatcher: BotDispatcher,
    session: SessionConfig,
}

impl EventHub {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        dispatcher: BotDispatcher,
        session: SessionConfig,
    ) -> Self {
        Self {
            viewers: ViewerTracker::new(registry.clone()),
            registry,
            dispatcher,
            session,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn viewers(&self) -> &ViewerTracker {
        &self.viewers
    }

    pub fn dispatcher(&self) -> &BotDispatcher {
        &self.dispatcher
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Register a new connection for an authenticated user.
    pub fn connect(&self, user_id: UserId) -> Arc<Connection> {
        let connection = self.registry.register(user_id);
        info!(connection_id = %connection.id(), user_id = %connection.user_id(), "connection opened");
        connection
    }

    /// Apply one text frame read from a connection. Malformed frames are
    /// logged and ignored.
    pub fn handle_client_frame(&self, connection: &Connection, text: &str) {
        let action = match ClientAction::parse(text) {
            Ok(action) => action,
            Err(e) => {
                debug!(connection_id = %connection.id(), "ignoring malformed client frame: {e}");
                return;
            }
        };

        match action {
            ClientAction::SetViewState { channel_id, state } => {
                if !self.registry.subscribe(connection.id(), &channel_id) {
                    debug!(connection_id = %connection.id(), "view state from closed connection ignored");
                    return;
                }
                self.viewers.set_state_for(connection, &channel_id, state);
            }
            ClientAction::Subscribe { channel_id } => {
                self.registry.subscribe(connection.id(), &channel_id);
            }
            ClientAction::Unsubscribe { channel_id } => {
                if self.registry.unsubscribe(connection.id(), &channel_id) {
                    self.release_viewer(&channel_id, connection.user_id());
                }
            }
        }
    }

    /// Unregister a connection and drop viewer entries the user no longer
    /// backs with any other connection. Safe to call more than once.
    pub fn disconnect(&self, id: ConnectionId, reason: CloseReason) {
        let Some(closed) = self.registry.unregister(id) else {
            return;
        };
        for channel_id in &closed.channels {
            self.release_viewer(channel_id, &closed.user_id);
        }
        huddle_prometheus::record_ws_closed(reason.as_ref());
        info!(connection_id = %id, user_id = %closed.user_id, %reason, "connection closed");
    }

    fn release_viewer(&self, channel_id: &ChannelId, user_id: &UserId) {
        self.viewers.remove_if_unbacked(channel_id, user_id);
    }

    /// Push the event to live connections and dispatch it to bots in the
    /// background. Returns how many connections the push reached.
    pub fn publish(self: &Arc<Self>, event: DomainEvent) -> usize {
        let reached = self.push(&event);
        let hub = self.clone();
        tokio::spawn(async move {
            hub.dispatcher.dispatch(event.kind, &event.payload).await;
        });
        reached
    }

    /// Like [`publish`](Self::publish) but waits for every bot delivery.
    pub async fn publish_and_wait(&self, event: DomainEvent) -> PublishReport {
        let connections = self.push(&event);
        let deliveries = self
            .dispatcher
            .dispatch(event.kind, &event.payload)
            .await
            .into_iter()
            .map(|(_, log)| log)
            .collect();
        PublishReport {
            connections,
            deliveries,
        }
    }

    fn push(&self, event: &DomainEvent) -> usize {
        let frame = protocol::event_push(event.kind, &event.payload);
        let reached = match &event.scope {
            EventScope::Channel(channel_id) => self.registry.broadcast(channel_id, frame),
            EventScope::Users(users) => users
                .iter()
                .map(|user_id| match self.registry.enqueue(user_id, frame.clone()) {
                    EnqueueOutcome::NoTarget => 0,
                    EnqueueOutcome::Delivered | EnqueueOutcome::Dropped => 1,
                })
                .sum(),
            EventScope::All => self.registry.broadcast_all(frame),
        };
        debug!(event = %event.kind, reached, "domain event pushed");
        reached
    }

    /// Unregister every connection. Their sessions end with
    /// [`CloseReason::QueueClosed`].
    pub fn close_all(&self) {
        let ids: Vec<ConnectionId> = self
            .registry
            .stats()
            .into_iter()
            .map(|s| s.connection_id)
            .collect();
        for id in ids {
            self.disconnect(id, CloseReason::QueueClosed);
        }
    }
}
