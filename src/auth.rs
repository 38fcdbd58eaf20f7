//! In-memory login sessions.
//!
//! Login issues a UUID token; requests carry it in the `x-session-token`
//! header. Tokens live for the process lifetime only.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::core::errors::ApiError;

const SESSION_HEADER: &str = "x-session-token";

#[derive(Clone, Default)]
pub struct SessionTokens {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for a logged-in user.
    pub fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.inner
            .write()
            .expect("session token lock poisoned")
            .insert(token.clone(), username.to_string());
        token
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.inner
            .write()
            .expect("session token lock poisoned")
            .remove(token)
            .is_some()
    }

    pub fn resolve(&self, token: &str) -> Option<String> {
        self.inner
            .read()
            .expect("session token lock poisoned")
            .get(token)
            .cloned()
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Resolve the request's session token to a username, or 401.
pub fn require_session(headers: &HeaderMap, tokens: &SessionTokens) -> Result<String, ApiError> {
    session_token(headers)
        .and_then(|token| tokens.resolve(token))
        .ok_or(ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn issued_tokens_resolve_until_revoked() {
        let tokens = SessionTokens::new();
        let token = tokens.issue("alice");

        assert_eq!(tokens.resolve(&token).as_deref(), Some("alice"));
        assert!(tokens.revoke(&token));
        assert_eq!(tokens.resolve(&token), None);
        assert!(!tokens.revoke(&token));
    }

    #[test]
    fn require_session_rejects_missing_or_unknown_token() {
        let tokens = SessionTokens::new();

        let headers = HeaderMap::new();
        assert!(matches!(
            require_session(&headers, &tokens),
            Err(ApiError::Unauthorized)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("not-a-token"));
        assert!(matches!(
            require_session(&headers, &tokens),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn require_session_returns_the_username() {
        let tokens = SessionTokens::new();
        let token = tokens.issue("alice");

        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_str(&token).unwrap());

        assert_eq!(require_session(&headers, &tokens).unwrap(), "alice");
    }
}
