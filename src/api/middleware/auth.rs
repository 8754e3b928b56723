//! Static bearer token check for the `/v1` routes

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::debug;

use crate::api::server::AppState;
use crate::error::RelayError;

/// Extractor that only succeeds when the request carries the configured
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct BearerAuth;

impl BearerAuth {
    /// Token part of an `Authorization` header value
    pub fn extract_token(authorization: &str) -> Option<&str> {
        authorization
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for BearerAuth {
    type Rejection = RelayError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(RelayError::MissingAuthHeader)?;

        let token = Self::extract_token(auth_header).ok_or(RelayError::InvalidToken)?;

        if !tokens_match(token, &state.api_token) {
            debug!(path = %parts.uri.path(), "Rejected request with wrong bearer token");
            return Err(RelayError::InvalidToken);
        }

        Ok(BearerAuth)
    }
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(BearerAuth::extract_token("Bearer abc"), Some("abc"));
        assert_eq!(BearerAuth::extract_token("Bearer "), None);
        assert_eq!(BearerAuth::extract_token("Basic abc"), None);
        assert_eq!(BearerAuth::extract_token("abc"), None);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("you-are-lucky", "you-are-lucky"));
        assert!(!tokens_match("you-are-lucky", "you-are-lucke"));
        assert!(!tokens_match("short", "you-are-lucky"));
    }
}
