// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Huddle realtime subsystem.
//!
//! Holds the identifiers, event and log types, the shared error type, and the
//! boundary traits implemented by the log store and session layer.

pub mod error;
pub mod traits;
pub mod types;

pub use error::HuddleError;
pub use traits::{BotEventLogStore, SessionResolver};
pub use types::{
    Bot, BotEvent, BotEventLog, BotEventType, BotId, ChannelId, ConnectionId, DeliveryResult,
    DomainEvent, EventScope, UserId, ViewState,
};
