// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary traits for the collaborators this subsystem does not own.
//!
//! Both traits use `#[async_trait]` so implementations can sit behind
//! `Arc<dyn ...>` in the gateway state.

pub mod log_store;
pub mod session;

pub use log_store::BotEventLogStore;
pub use session::SessionResolver;
