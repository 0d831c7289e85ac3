//! Bearer token issuing and verification (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cms_core::records::UserProfile;
use cms_core::{Role, UserId};

use crate::config::JwtConfig;

/// Token errors.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies bearer tokens with the configured secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl_secs: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            ttl_secs: i64::try_from(config.ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for `user`, valid from `now` for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user: &UserProfile, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.as_str().to_owned(),
            role: user.role,
            full_name: user.full_name.clone(),
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify signature, issuer and expiry, and return the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for an expired token and
    /// `TokenError::Invalid` for anything else that fails validation.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::TimeDelta;
    use secrecy::SecretString;

    use super::*;

    fn config(issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: SecretString::from("k3P9vQ2xL7mN4bR8tY1wZ6cF0hJ5gD3s"),
            issuer: issuer.to_owned(),
            ttl: Duration::from_secs(3600),
        }
    }

    fn officer() -> UserProfile {
        UserProfile {
            id: UserId::generate(),
            email: cms_core::Email::parse("field@police.et").unwrap(),
            full_name: "Meron Tesfaye".into(),
            badge_number: Some("FO-221".into()),
            role: Role::FieldOfficer,
            department: None,
            phone: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(&config("cms"));
        let user = officer();
        let token = tokens.issue(&user, Utc::now()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::FieldOfficer);
        assert_eq!(claims.email, "field@police.et");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token() {
        let tokens = TokenService::new(&config("cms"));
        let issued = Utc::now() - TimeDelta::days(2);
        let token = tokens.issue(&officer(), issued).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = TokenService::new(&config("other"))
            .issue(&officer(), Utc::now())
            .unwrap();
        let tokens = TokenService::new(&config("cms"));
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = TokenService::new(&config("cms"));
        let mut token = tokens.issue(&officer(), Utc::now()).unwrap();
        token.push('x');
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
        assert!(matches!(tokens.verify("not-a-token"), Err(TokenError::Invalid)));
    }
}
