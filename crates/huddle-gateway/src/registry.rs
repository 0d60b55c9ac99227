// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of live client connections.
//!
//! Connections are indexed three ways: by id, by user, and by subscribed
//! channel. The per-user and per-channel indexes only ever hold ids of
//! registered connections; `unregister` removes the id from every index
//! before returning.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use huddle_core::{ChannelId, ConnectionId, UserId};
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::queue::{OutboundQueue, PushOutcome};

/// One live client connection.
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    queue: OutboundQueue,
    channels: Mutex<HashSet<ChannelId>>,
    last_activity: Mutex<Instant>,
}

impl Connection {
    fn new(user_id: UserId, capacity: usize) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            queue: OutboundQueue::new(capacity),
            channels: Mutex::new(HashSet::new()),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn is_subscribed(&self, channel_id: &ChannelId) -> bool {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(channel_id)
    }

    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<_> = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        channels.sort();
        channels
    }

    pub fn last_activity(&self) -> Instant {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn push(&self, message: Arc<str>) -> PushOutcome {
        let outcome = self.queue.push(message);
        if outcome == PushOutcome::DisplacedOldest {
            debug!(connection_id = %self.id, user_id = %self.user_id, "outbound queue full, dropped oldest message");
            huddle_prometheus::record_ws_dropped(1);
        }
        outcome
    }
}

/// What remained of a connection after it was unregistered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedConnection {
    pub id: ConnectionId,
    pub user_id: UserId,
    /// Channels the connection was subscribed to, sorted.
    pub channels: Vec<ChannelId>,
}

/// Outcome of a targeted push to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Every connection of the user accepted the message without loss.
    Delivered,
    /// The message was queued but at least one connection dropped an older
    /// message to make room.
    Dropped,
    /// The user has no live connection.
    NoTarget,
}

/// Queue statistics for one connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub depth: usize,
    pub capacity: usize,
    pub dropped: u64,
    pub channels: Vec<ChannelId>,
}

pub struct ConnectionRegistry {
    queue_capacity: usize,
    connections: DashMap<ConnectionId, Arc<Connection>>,
    by_user: DashMap<UserId, HashSet<ConnectionId>>,
    by_channel: DashMap<ChannelId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            connections: DashMap::new(),
            by_user: DashMap::new(),
            by_channel: DashMap::new(),
        }
    }

    pub fn register(&self, user_id: UserId) -> Arc<Connection> {
        let connection = Arc::new(Connection::new(user_id.clone(), self.queue_capacity));
        self.connections.insert(connection.id, connection.clone());
        self.by_user
            .entry(user_id)
            .or_default()
            .insert(connection.id);
        huddle_prometheus::record_ws_registered();
        connection
    }

    /// Remove a connection from every index and close its queue.
    ///
    /// Returns `None` if the connection was already gone, so repeated calls
    /// are harmless.
    pub fn unregister(&self, id: ConnectionId) -> Option<ClosedConnection> {
        let (_, connection) = self.connections.remove(&id)?;
        connection.queue.close();

        let channels: Vec<ChannelId> = {
            let mut set = connection
                .channels
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut channels: Vec<_> = set.drain().collect();
            channels.sort();
            channels
        };
        for channel_id in &channels {
            self.detach(&self.by_channel, channel_id, id);
        }
        self.detach(&self.by_user, &connection.user_id, id);
        huddle_prometheus::record_ws_unregistered();

        Some(ClosedConnection {
            id,
            user_id: connection.user_id.clone(),
            channels,
        })
    }

    fn detach<K>(&self, index: &DashMap<K, HashSet<ConnectionId>>, key: &K, id: ConnectionId)
    where
        K: std::hash::Hash + Eq,
    {
        if let Some(mut ids) = index.get_mut(key) {
            ids.remove(&id);
        }
        index.remove_if(key, |_, ids| ids.is_empty());
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|c| c.value().clone())
    }

    /// Subscribe a connection to a channel. Returns `false` if the
    /// connection is not registered.
    pub fn subscribe(&self, id: ConnectionId, channel_id: &ChannelId) -> bool {
        let Some(connection) = self.get(id) else {
            return false;
        };
        connection
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_id.clone());
        self.by_channel
            .entry(channel_id.clone())
            .or_default()
            .insert(id);

        // Lost a race with unregister: undo the index entry.
        if !self.connections.contains_key(&id) {
            self.detach(&self.by_channel, channel_id, id);
            return false;
        }
        true
    }

    /// Returns `true` if the connection was subscribed.
    pub fn unsubscribe(&self, id: ConnectionId, channel_id: &ChannelId) -> bool {
        let Some(connection) = self.get(id) else {
            return false;
        };
        let removed = connection
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel_id);
        if removed {
            self.detach(&self.by_channel, channel_id, id);
        }
        removed
    }

    /// Whether the connection is still registered and subscribed to
    /// `channel_id`.
    pub fn is_subscribed(&self, id: ConnectionId, channel_id: &ChannelId) -> bool {
        self.get(id).is_some_and(|c| c.is_subscribed(channel_id))
    }

    /// Whether any registered connection of `user_id` is subscribed to
    /// `channel_id`.
    pub fn is_user_subscribed(&self, user_id: &UserId, channel_id: &ChannelId) -> bool {
        self.user_connections(user_id)
            .iter()
            .any(|c| c.is_subscribed(channel_id))
    }

    pub fn touch(&self, id: ConnectionId) {
        if let Some(connection) = self.connections.get(&id) {
            connection.touch();
        }
    }

    fn user_connections(&self, user_id: &UserId) -> Vec<Arc<Connection>> {
        let ids: Vec<ConnectionId> = match self.by_user.get(user_id) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    fn channel_connections(&self, channel_id: &ChannelId) -> Vec<Arc<Connection>> {
        let ids: Vec<ConnectionId> = match self.by_channel.get(channel_id) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Queue `message` on every connection of `user_id`.
    pub fn enqueue(&self, user_id: &UserId, message: Arc<str>) -> EnqueueOutcome {
        let mut reached = false;
        let mut dropped = false;
        for connection in self.user_connections(user_id) {
            match connection.push(message.clone()) {
                PushOutcome::Queued => reached = true,
                PushOutcome::DisplacedOldest => {
                    reached = true;
                    dropped = true;
                }
                PushOutcome::Closed => {}
            }
        }
        match (reached, dropped) {
            (false, _) => EnqueueOutcome::NoTarget,
            (true, true) => EnqueueOutcome::Dropped,
            (true, false) => EnqueueOutcome::Delivered,
        }
    }

    /// Queue `message` on every connection subscribed to `channel_id`.
    /// Returns the number of connections that accepted it.
    pub fn broadcast(&self, channel_id: &ChannelId, message: Arc<str>) -> usize {
        self.channel_connections(channel_id)
            .into_iter()
            .filter(|c| c.push(message.clone()) != PushOutcome::Closed)
            .count()
    }

    /// Queue `message` on every registered connection.
    pub fn broadcast_all(&self, message: Arc<str>) -> usize {
        let connections: Vec<Arc<Connection>> =
            self.connections.iter().map(|c| c.value().clone()).collect();
        connections
            .into_iter()
            .filter(|c| c.push(message.clone()) != PushOutcome::Closed)
            .count()
    }

    pub fn stats(&self) -> Vec<ConnectionStats> {
        let mut stats: Vec<ConnectionStats> = self
            .connections
            .iter()
            .map(|entry| {
                let c = entry.value();
                ConnectionStats {
                    connection_id: c.id,
                    user_id: c.user_id.clone(),
                    depth: c.queue.depth(),
                    capacity: c.queue.capacity(),
                    dropped: c.queue.dropped(),
                    channels: c.channels(),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        stats
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn index_sizes(&self) -> (usize, usize) {
        (self.by_user.len(), self.by_channel.len())
    }
}
