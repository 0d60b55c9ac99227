// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot side of the realtime subsystem: the bot registry, the outbound
//! webhook dispatcher, and an in-memory delivery log store.

pub mod dispatcher;
pub mod log_store;
pub mod registry;

pub use dispatcher::{BotDispatcher, DispatcherConfig};
pub use log_store::MemoryLogStore;
pub use registry::BotRegistry;
