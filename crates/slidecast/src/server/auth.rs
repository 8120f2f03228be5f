use axum::extract::{FromRequestParts, Query};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use rand::Rng;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

pub const TOKEN_HEADER: &str = "x-presenter-token";

/// Per-launch secret that unlocks presenter actions.
#[derive(Debug, Clone)]
pub struct PresenterToken(String);

impl PresenterToken {
    /// Generate a random 32-byte hex token.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 32] = rng.random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, candidate: Option<&str>) -> bool {
        candidate.is_some_and(|c| constant_time_eq(&self.0, c))
    }
}

impl From<&str> for PresenterToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Token from `?token=`, falling back to the `x-presenter-token` header.
pub fn supplied_token<'a>(headers: &'a HeaderMap, query: &'a TokenQuery) -> Option<&'a str> {
    query
        .token
        .as_deref()
        .or_else(|| headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()))
}

fn check(parts: &Parts, state: &AppState) -> Result<(), ApiError> {
    let query = Query::<TokenQuery>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    if state.token.verify(supplied_token(&parts.headers, &query)) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Guard for annotation mutations: the token is always required.
pub struct Presenter;

impl FromRequestParts<AppState> for Presenter {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        check(parts, state).map(|()| Presenter)
    }
}

/// Guard for shared slide navigation. Open deployments let anyone steer.
pub struct Navigator;

impl FromRequestParts<AppState> for Navigator {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.settings.open_navigation {
            return Ok(Navigator);
        }
        check(parts, state).map(|()| Navigator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_hex_and_unique() {
        let a = PresenterToken::generate();
        let b = PresenterToken::generate();
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_verify() {
        let token = PresenterToken::from("secret");
        assert!(token.verify(Some("secret")));
        assert!(!token.verify(Some("secreT")));
        assert!(!token.verify(Some("secret2")));
        assert!(!token.verify(Some("")));
        assert!(!token.verify(None));
    }

    #[test]
    fn test_query_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, "from-header".parse().unwrap());
        let query = TokenQuery {
            token: Some("from-query".into()),
        };
        assert_eq!(supplied_token(&headers, &query), Some("from-query"));
        assert_eq!(supplied_token(&headers, &TokenQuery::default()), Some("from-header"));
        assert_eq!(supplied_token(&HeaderMap::new(), &TokenQuery::default()), None);
    }
}
