//! Request timeout and API-token authentication.

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use hmac::{digest::InvalidLength, Hmac, Mac};
use sha2::Sha256;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation key for token MACs.
const TOKEN_MAC_KEY: &[u8] = b"feedback-svc/api-token/v1";

/// The configured API token, held only as an HMAC tag.
///
/// Presented tokens are MACed under the same key and compared with
/// [`Mac::verify_slice`], which runs in constant time.
#[derive(Clone)]
pub struct ApiToken {
    mac: HmacSha256,
    expected: Vec<u8>,
}

impl ApiToken {
    /// Build a verifier for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLength`] if the MAC key is rejected.
    pub fn new(token: &str) -> Result<Self, InvalidLength> {
        let mac = HmacSha256::new_from_slice(TOKEN_MAC_KEY)?;
        let mut tagger = mac.clone();
        tagger.update(token.as_bytes());
        let expected = tagger.finalize().into_bytes().to_vec();
        Ok(Self { mac, expected })
    }

    /// `true` if `presented` equals the configured token.
    pub fn verify(&self, presented: &str) -> bool {
        let mut mac = self.mac.clone();
        mac.update(presented.as_bytes());
        mac.verify_slice(&self.expected).is_ok()
    }

    /// Check the `Authorization` header, accepting both a bare token and
    /// `Bearer <token>`.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        !token.is_empty() && self.verify(token)
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn verify_matches_only_the_configured_token() {
        let token = ApiToken::new("very-secret-token").unwrap();
        assert!(token.verify("very-secret-token"));
        assert!(!token.verify("very-secret-tokem"));
        assert!(!token.verify(""));
    }

    #[test]
    fn authorize_accepts_bare_and_bearer() {
        let token = ApiToken::new("very-secret-token").unwrap();
        assert!(token.authorize(&headers("very-secret-token")));
        assert!(token.authorize(&headers("Bearer very-secret-token")));
    }

    #[test]
    fn authorize_rejects_missing_or_wrong() {
        let token = ApiToken::new("very-secret-token").unwrap();
        assert!(!token.authorize(&HeaderMap::new()));
        assert!(!token.authorize(&headers("Bearer nope")));
        assert!(!token.authorize(&headers("Bearer ")));
    }

    #[test]
    fn debug_is_redacted() {
        let token = ApiToken::new("very-secret-token").unwrap();
        assert!(!format!("{token:?}").contains("very-secret-token"));
    }
}
