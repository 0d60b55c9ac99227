// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel viewer presence.
//!
//! Each (channel, user) pair holds at most one [`ViewState`]. Every change is
//! broadcast to the channel's subscribers as a `viewerChanged` frame while
//! the channel's shard is still locked, so subscribers observe changes to a
//! given pair in the order they were applied.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use huddle_core::{ChannelId, UserId, ViewState};
use serde::Serialize;
use tracing::debug;

use crate::protocol;
use crate::registry::{Connection, ConnectionRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerEntry {
    pub user_id: UserId,
    pub state: ViewState,
}

pub struct ViewerTracker {
    channels: DashMap<ChannelId, HashMap<UserId, ViewState>>,
    registry: Arc<ConnectionRegistry>,
}

impl ViewerTracker {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            channels: DashMap::new(),
            registry,
        }
    }

    /// Record `state` for the pair and notify the channel's subscribers.
    /// Returns how many connections the notification reached.
    pub fn set_state(&self, channel_id: &ChannelId, user_id: &UserId, state: ViewState) -> usize {
        let mut viewers = self.channels.entry(channel_id.clone()).or_default();
        let reached = self.store(&mut viewers, channel_id, user_id, state);
        drop(viewers);
        self.record_change(channel_id, user_id, state, reached);
        reached
    }

    /// Record `state` on behalf of one connection, but only while that
    /// connection is registered and subscribed to the channel. The check runs
    /// under the channel's lock, the same lock [`remove_if_unbacked`] holds,
    /// so an entry is never stored for a connection that has already been
    /// cleaned up. Returns `None` when nothing was stored.
    ///
    /// [`remove_if_unbacked`]: Self::remove_if_unbacked
    pub fn set_state_for(
        &self,
        connection: &Connection,
        channel_id: &ChannelId,
        state: ViewState,
    ) -> Option<usize> {
        let user_id = connection.user_id();
        let mut viewers = self.channels.entry(channel_id.clone()).or_default();
        if !self.registry.is_subscribed(connection.id(), channel_id) {
            let empty = viewers.is_empty();
            drop(viewers);
            if empty {
                self.channels
                    .remove_if(channel_id, |_, viewers| viewers.is_empty());
            }
            debug!(connection_id = %connection.id(), channel_id = %channel_id, "view state from unsubscribed connection ignored");
            return None;
        }
        let reached = self.store(&mut viewers, channel_id, user_id, state);
        drop(viewers);
        self.record_change(channel_id, user_id, state, reached);
        Some(reached)
    }

    fn store(
        &self,
        viewers: &mut HashMap<UserId, ViewState>,
        channel_id: &ChannelId,
        user_id: &UserId,
        state: ViewState,
    ) -> usize {
        viewers.insert(user_id.clone(), state);
        self.registry.broadcast(
            channel_id,
            protocol::viewer_changed(channel_id, user_id, state),
        )
    }

    fn record_change(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        state: ViewState,
        reached: usize,
    ) {
        huddle_prometheus::record_viewer_change(state.as_ref());
        debug!(channel_id = %channel_id, user_id = %user_id, state = %state, reached, "viewer state changed");
    }

    /// Same as [`set_state`](Self::set_state) for a raw wire string.
    pub fn set_state_str(&self, channel_id: &ChannelId, user_id: &UserId, raw: &str) -> usize {
        self.set_state(channel_id, user_id, ViewState::parse_lenient(raw))
    }

    pub fn get(&self, channel_id: &ChannelId, user_id: &UserId) -> Option<ViewState> {
        self.channels
            .get(channel_id)
            .and_then(|viewers| viewers.get(user_id).copied())
    }

    /// Current viewers of a channel, ordered by user id.
    pub fn get_snapshot(&self, channel_id: &ChannelId) -> Vec<ViewerEntry> {
        let mut entries: Vec<ViewerEntry> = match self.channels.get(channel_id) {
            Some(viewers) => viewers
                .iter()
                .map(|(user_id, state)| ViewerEntry {
                    user_id: user_id.clone(),
                    state: *state,
                })
                .collect(),
            None => Vec::new(),
        };
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        entries
    }

    /// Drop the pair's entry and tell subscribers the user is gone
    /// (a `viewerChanged` with state `none`). Returns `false` if there was
    /// no entry, in which case nothing is broadcast.
    pub fn remove(&self, channel_id: &ChannelId, user_id: &UserId) -> bool {
        self.remove_where(channel_id, user_id, || true)
    }

    /// Like [`remove`](Self::remove), but keeps the entry while any
    /// registered connection of the user is still subscribed to the channel.
    /// The subscription check and the removal happen under the channel's
    /// lock.
    pub fn remove_if_unbacked(&self, channel_id: &ChannelId, user_id: &UserId) -> bool {
        self.remove_where(channel_id, user_id, || {
            !self.registry.is_user_subscribed(user_id, channel_id)
        })
    }

    fn remove_where(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
        unbacked: impl FnOnce() -> bool,
    ) -> bool {
        let removed = {
            let Some(mut viewers) = self.channels.get_mut(channel_id) else {
                return false;
            };
            let removed = viewers.contains_key(user_id) && unbacked();
            if removed {
                viewers.remove(user_id);
                self.registry.broadcast(
                    channel_id,
                    protocol::viewer_changed(channel_id, user_id, ViewState::None),
                );
            }
            removed
        };
        self.channels
            .remove_if(channel_id, |_, viewers| viewers.is_empty());

        if removed {
            huddle_prometheus::record_viewer_change("removed");
            debug!(channel_id = %channel_id, user_id = %user_id, "viewer removed");
        }
        removed
    }

    /// Number of channels with at least one viewer entry.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
