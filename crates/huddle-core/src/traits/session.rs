// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lookup used by the duplex handshake.

use async_trait::async_trait;

use crate::types::UserId;

/// Resolves an opaque session credential to the authenticated user.
///
/// Cookie/session management lives outside this subsystem; the handshake only
/// needs to know whether a credential maps to a user.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Returns `None` when the credential is unknown or expired.
    async fn resolve(&self, credential: &str) -> Option<UserId>;
}
