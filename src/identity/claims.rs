//! Bearer token claims.
//!
//! Tokens are JWT-shaped (`header.payload.signature`, base64url without padding).
//! The client only reads the payload; signature checks belong to the backend.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::principal::{Identity, Position, Role};
use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Expiry, unix seconds.
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl TokenClaims {
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let mut parts = token.trim().split('.');
        let (Some(_header), Some(payload), Some(_sig), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err(AuthError::MalformedToken("expected three dot-separated segments".into()));
        };
        // Some issuers pad; strip it so the no-pad engine accepts both.
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {}", e)))?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(format!("payload is not valid claims: {}", e)))
    }

    /// Serialize into an unsigned-looking token with the given signature segment.
    pub fn encode(&self, signature: &[u8]) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default());
        let sig = URL_SAFE_NO_PAD.encode(signature);
        format!("{}.{}.{}", header, payload, sig)
    }

    pub fn identity(&self) -> Identity {
        Identity::from_parts(self.sub.clone(), self.role, self.position)
    }

    pub fn is_expired_at(&self, now_unix: i64) -> bool { self.exp <= now_unix }

    pub fn is_expired(&self) -> bool { self.is_expired_at(chrono::Utc::now().timestamp()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(exp: i64) -> TokenClaims {
        TokenClaims { sub: "2021-00123".into(), role: Role::Admin, position: Some(Position::Finance), exp, iat: Some(exp - 3600) }
    }

    #[test]
    fn decode_reads_payload() {
        let tok = sample(2_000_000_000).encode(b"sig");
        let claims = TokenClaims::decode(&tok).unwrap();
        assert_eq!(claims.sub, "2021-00123");
        assert_eq!(claims.identity(), Identity::admin("2021-00123", Position::Finance));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(TokenClaims::decode("not-a-token"), Err(AuthError::MalformedToken(_))));
        assert!(matches!(TokenClaims::decode("a.!!!.c"), Err(AuthError::MalformedToken(_))));
        let not_claims = format!("x.{}.y", URL_SAFE_NO_PAD.encode(b"{\"hello\":1}"));
        assert!(matches!(TokenClaims::decode(&not_claims), Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn expiry_has_no_leeway() {
        let c = sample(1_000);
        assert!(c.is_expired_at(1_000));
        assert!(!c.is_expired_at(999));
    }

    #[test]
    fn admin_claims_without_position_become_general() {
        let mut c = sample(2_000_000_000);
        c.position = None;
        assert_eq!(c.identity().position(), Some(Position::General));
    }
}
