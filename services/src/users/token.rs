//! HS256 session tokens issued at login.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// `iss` claim of every session token.
pub const ISSUER: &str = "Foodgram";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// User id, as a decimal string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Invalid token subject")]
    InvalidSubject,

    #[error("Token validation failed: {0}")]
    Invalid(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

pub fn generate_session_token(
    user_id: i64,
    jwt_secret: &str,
    ttl_seconds: i64,
) -> Result<String, TokenError> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_seconds,
        iss: ISSUER.to_owned(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| TokenError::Encoding(e.to_string()))
}

pub fn validate_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
        _ => TokenError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-jwt-secret-for-unit-tests";

    #[test]
    fn round_trip() {
        let token = generate_session_token(42, SECRET, 3600).unwrap();
        let claims = validate_session_token(&token, SECRET).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_session_token(42, SECRET, 3600).unwrap();
        assert!(matches!(
            validate_session_token(&token, "other-secret"),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the default 60s leeway
        let token = generate_session_token(42, SECRET, -120).unwrap();
        assert!(matches!(
            validate_session_token(&token, SECRET),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(validate_session_token("not-a-jwt", SECRET).is_err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let claims = SessionClaims {
            sub: "alice".to_owned(),
            iat: 0,
            exp: 0,
            iss: ISSUER.to_owned(),
        };
        assert!(matches!(claims.user_id(), Err(TokenError::InvalidSubject)));
    }
}
