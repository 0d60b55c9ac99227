// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the gateway.
//!
//! Two separate concerns live here:
//! 1. The REST API is guarded by a static bearer token (`Authorization: Bearer <token>`)
//! 2. The duplex handshake resolves a user session credential through a
//!    [`SessionResolver`]
//!
//! When no bearer token is configured the REST API rejects every request
//! (fail-closed).

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use dashmap::DashMap;
use huddle_core::{SessionResolver, UserId};

/// Cookie carrying the user session credential.
pub const SESSION_COOKIE: &str = "huddle_session";

/// Authentication configuration for the REST API.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables the API.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware that validates the API bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_token) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no API token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match bearer {
        Some(TypedHeader(auth)) if auth.token() == expected_token => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Pick the session credential from a handshake request.
///
/// Checked in order: bearer header, session cookie, `token` query parameter.
pub fn handshake_credential(
    bearer: Option<&Authorization<Bearer>>,
    jar: &CookieJar,
    query_token: Option<&str>,
) -> Option<String> {
    bearer
        .map(|auth| auth.token().to_string())
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .or_else(|| query_token.map(str::to_string))
        .filter(|credential| !credential.is_empty())
}

/// In-memory credential -> user table.
#[derive(Debug, Default)]
pub struct TokenSessions {
    sessions: DashMap<String, UserId>,
}

impl TokenSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: impl Into<String>, user_id: UserId) {
        self.sessions.insert(credential.into(), user_id);
    }

    pub fn revoke(&self, credential: &str) -> Option<UserId> {
        self.sessions.remove(credential).map(|(_, user)| user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, UserId)> for TokenSessions {
    fn from_iter<I: IntoIterator<Item = (K, UserId)>>(iter: I) -> Self {
        let sessions = Self::new();
        for (credential, user_id) in iter {
            sessions.insert(credential, user_id);
        }
        sessions
    }
}

#[async_trait]
impl SessionResolver for TokenSessions {
    async fn resolve(&self, credential: &str) -> Option<UserId> {
        self.sessions.get(credential).map(|u| u.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }

    fn jar_with(cookie: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn credential_prefers_bearer_then_cookie_then_query() {
        let bearer = Authorization::bearer("from-header").unwrap();
        let jar = jar_with("huddle_session=from-cookie; theme=dark");

        assert_eq!(
            handshake_credential(Some(&bearer), &jar, Some("from-query")).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            handshake_credential(None, &jar, Some("from-query")).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            handshake_credential(None, &CookieJar::new(), Some("from-query")).as_deref(),
            Some("from-query")
        );
        assert_eq!(handshake_credential(None, &CookieJar::new(), None), None);
        assert_eq!(handshake_credential(None, &CookieJar::new(), Some("")), None);
    }

    #[tokio::test]
    async fn token_sessions_resolve_and_revoke() {
        let sessions: TokenSessions = [("t-1", UserId::from("alice"))].into_iter().collect();
        assert_eq!(sessions.resolve("t-1").await, Some(UserId::from("alice")));
        assert_eq!(sessions.resolve("t-2").await, None);
        assert_eq!(sessions.revoke("t-1"), Some(UserId::from("alice")));
        assert!(sessions.resolve("t-1").await.is_none());
        assert!(sessions.is_empty());
    }
}
