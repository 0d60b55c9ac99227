// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Huddle realtime subsystem.

use thiserror::Error;

/// The primary error type shared by every Huddle crate.
#[derive(Debug, Error)]
pub enum HuddleError {
    /// Configuration errors (invalid TOML, bad bot definitions, bad limits).
    #[error("configuration error: {0}")]
    Config(String),

    /// Duplex connection errors (bind failure, transport error, closed socket).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound bot delivery setup errors (client construction, bad URL).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A looked-up entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An event type name outside the closed set of bot events.
    #[error("unsupported event type `{0}`")]
    InvalidEventType(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
