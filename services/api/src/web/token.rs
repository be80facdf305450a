//! services/api/src/web/token.rs
//!
//! Issues and verifies the signed bearer tokens that carry an account
//! identity. Tokens are HMAC-signed JWTs with a 30-day default lifetime and
//! are not revocable before expiry; the signing secret is process-wide
//! configuration, so rotating it invalidates every outstanding token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two caller-visible verification failures. They must stay distinct so
/// the auth gate can tell "log in again" apart from "invalid token".
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    Malformed,
    #[error("Token expired, please login again")]
    Expired,
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Token claims. The subject field is `sub`, and only `sub` - one canonical
/// name for the account id, nothing else is accepted.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed account tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issues a token for the account, expiring `ttl` from now.
    pub fn issue(&self, account_id: Uuid) -> Result<String, TokenError> {
        self.issue_at(account_id, Utc::now())
    }

    fn issue_at(&self, account_id: Uuid, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies a token and returns the account id it was issued for.
    ///
    /// Expiry and malformedness are reported as distinct kinds; a subject
    /// that is not a valid id counts as malformed.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Malformed,
                }
            })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret-key-for-testing-only", Duration::days(30))
    }

    #[test]
    fn issue_then_verify_round_trips_the_id() {
        let tokens = service();
        let account_id = Uuid::new_v4();

        let token = tokens.issue(account_id).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), account_id);
    }

    #[test]
    fn expired_token_fails_with_the_expired_kind() {
        let tokens = service();
        // Issued 31 days ago with a 30-day ttl: a day past expiry, well
        // beyond the default validation leeway.
        let token = tokens
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(31))
            .unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_malformed_not_expired() {
        let tokens = service();
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn foreign_signature_is_malformed() {
        let tokens = service();
        let other = TokenService::new(b"a-completely-different-secret", Duration::days(30));

        let token = other.issue(Uuid::new_v4()).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn non_uuid_subject_is_malformed() {
        let tokens = service();
        let now = Utc::now();
        let claims = Claims {
            sub: "alice".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(1)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &tokens.encoding_key).unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Malformed));
    }
}
