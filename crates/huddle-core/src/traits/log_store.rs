// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sink for bot delivery records.

use async_trait::async_trait;

use crate::error::HuddleError;
use crate::types::{BotEventLog, BotId};

/// Append-only store of [`BotEventLog`] records.
///
/// The dispatcher appends exactly one record per delivery attempt. A failing
/// append is logged by the caller and never changes the delivery outcome.
#[async_trait]
pub trait BotEventLogStore: Send + Sync {
    /// Append one record.
    async fn append(&self, log: BotEventLog) -> Result<(), HuddleError>;

    /// Most recent records for `bot_id`, newest first.
    async fn recent(&self, bot_id: &BotId, limit: usize) -> Result<Vec<BotEventLog>, HuddleError>;
}
