// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-memory delivery log.

use std::collections::VecDeque;

use async_trait::async_trait;
use huddle_core::{BotEventLog, BotEventLogStore, BotId, HuddleError};
use tokio::sync::Mutex;

/// Ring buffer of the most recent delivery records.
///
/// Once `capacity` records are held, the oldest record is evicted on append.
pub struct MemoryLogStore {
    capacity: usize,
    logs: Mutex<VecDeque<BotEventLog>>,
}

impl MemoryLogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            logs: Mutex::new(VecDeque::new()),
        }
    }

    /// Every stored record, oldest first.
    pub async fn all(&self) -> Vec<BotEventLog> {
        self.logs.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.logs.lock().await.len()
    }
}

#[async_trait]
impl BotEventLogStore for MemoryLogStore {
    async fn append(&self, log: BotEventLog) -> Result<(), HuddleError> {
        let mut logs = self.logs.lock().await;
        if logs.len() == self.capacity {
            logs.pop_front();
        }
        logs.push_back(log);
        Ok(())
    }

    async fn recent(&self, bot_id: &BotId, limit: usize) -> Result<Vec<BotEventLog>, HuddleError> {
        let logs = self.logs.lock().await;
        Ok(logs
            .iter()
            .rev()
            .filter(|log| &log.bot_id == bot_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
