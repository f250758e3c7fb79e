//! Session tokens.
//!
//! HS256 JWTs carrying `{id: username, role, iat, exp}`. Tokens are not stored;
//! validity is checked per request from the signature and expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use salon_core::Role;

/// Errors from issuing or validating tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's `exp` is in the past.
    #[error("Your token has expired! Please log in again.")]
    Expired,

    /// Bad signature, wrong algorithm or malformed token.
    #[error("Invalid token. Please log in again!")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username of the account.
    pub id: String,
    pub role: Role,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and validates session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service signing with `secret`; tokens live for `ttl`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 60; // seconds of clock skew

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `username` with `role`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, username: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(username, role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(&self, username: &str, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = SessionClaims {
            id: username.to_owned(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Check a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for expired tokens and
    /// `TokenError::Invalid` for anything else that fails validation.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                    TokenError::Expired
                } else {
                    TokenError::Invalid(e)
                }
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            &SecretString::from("q8Zr!v2#Lm9@Tx4$Wp7^Kd1&Hs6*Nb3%"),
            Duration::days(1),
        )
    }

    #[test]
    fn test_issue_then_validate() {
        let tokens = service();
        let token = tokens.issue("bobstone", Role::ContentCreator).unwrap();
        let claims = tokens.validate(&token).unwrap();

        assert_eq!(claims.id, "bobstone");
        assert_eq!(claims.role, Role::ContentCreator);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let token = tokens
            .issue_at("bobstone", Role::Admin, Utc::now() - Duration::days(2))
            .unwrap();
        assert!(matches!(tokens.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = TokenService::new(
            &SecretString::from("Zx9!pL3@qR7#mN1$vB5%tY8^wK2&cF6*"),
            Duration::days(1),
        );
        let token = other.issue("mallory", Role::Admin).unwrap();
        assert!(matches!(
            service().validate(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            service().validate("not.a.token"),
            Err(TokenError::Invalid(_))
        ));
    }
}
