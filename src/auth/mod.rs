use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;

pub mod password;
pub mod refresh;

pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking, PasswordError,
};
pub use refresh::generate_refresh_token;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub account_name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i32, account_name: impl Into<String>, expiration_hours: i64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiration_hours)).timestamp();

        Self {
            user_id,
            account_name: account_name.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    Invalid(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::Invalid(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "JWT secret not configured"),
        }
    }
}

impl std::error::Error for JwtError {}

/// A freshly signed access token and its lifetime in seconds
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Sign an HS256 access token for the given account
pub fn issue_token(config: &JwtConfig, user_id: i32, account_name: &str) -> Result<IssuedToken, JwtError> {
    let claims = Claims::new(user_id, account_name, config.expiration_hours);
    let token = generate_jwt(config, &claims)?;

    Ok(IssuedToken {
        token,
        expires_in: config.expiration_hours * 3600,
    })
}

pub fn generate_jwt(config: &JwtConfig, claims: &Claims) -> Result<String, JwtError> {
    if config.secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the embedded claims
pub fn validate_jwt(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    if config.secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            expiration_hours: 24,
            refresh_expiration_days: 7,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let config = jwt_config("test-secret");
        let issued = issue_token(&config, 42, "alice").unwrap();
        assert_eq!(issued.expires_in, 24 * 3600);

        let claims = validate_jwt(&config, &issued.token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.account_name, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issued = issue_token(&jwt_config("one"), 1, "bob").unwrap();
        let err = validate_jwt(&jwt_config("two"), &issued.token).unwrap_err();
        assert!(matches!(err, JwtError::Invalid(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let config = jwt_config("test-secret");
        // Past the default 60s leeway
        let claims = Claims::new(7, "carol", -2);
        let token = generate_jwt(&config, &claims).unwrap();
        assert!(matches!(validate_jwt(&config, &token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let config = jwt_config("");
        assert!(matches!(issue_token(&config, 1, "x"), Err(JwtError::InvalidSecret)));
    }
}
