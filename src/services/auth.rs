//! JWT issuance and the bearer-token extractor

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Login tokens are long-lived, matching the mobile client's session model
const ACCESS_TOKEN_EXPIRY_DAYS: i64 = 15;

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id as string
    pub exp: i64,    // expiry timestamp
    pub iat: i64,    // issued at
}

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    Expired,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::Expired => write!(f, "Token expired"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Create a signed access token for a user
pub fn create_access_token(user_id: i64, secret: &[u8]) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::days(ACCESS_TOKEN_EXPIRY_DAYS);

    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validate an access token and return the user_id
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<i64, AuthError> {
    // Pin HS256 to prevent algorithm confusion
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub", "iat"]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken,
        })?;

    token_data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| AuthError::InvalidToken)
}

/// Extractor that validates the Authorization bearer token and yields the user_id
pub struct AuthUser(pub i64);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let user_id = validate_access_token(token, &state.jwt_secret).map_err(|e| {
            eprintln!("JWT validation failed: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let secret = b"test-secret";
        let token = create_access_token(42, secret).unwrap();
        assert_eq!(validate_access_token(&token, secret).unwrap(), 42);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token(7, b"secret-a").unwrap();
        assert!(validate_access_token(&token, b"secret-b").is_err());
    }
}
