use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to generate token: {0}")]
    TokenGenerationError(String),
    #[error("Failed to validate token: {0}")]
    TokenValidationError(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // user id
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct JwtService {
    secret: String,
    token_duration: Duration,
}

impl JwtService {
    pub fn new(secret: String, expires_in_days: i64) -> Self {
        Self {
            secret,
            token_duration: Duration::days(expires_in_days),
        }
    }

    pub fn generate_token(&self, user_id: Uuid) -> Result<String, JwtError> {
        self.generate_token_at(user_id, Utc::now())
    }

    pub fn generate_token_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String, JwtError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.token_duration).timestamp(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::TokenGenerationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = jsonwebtoken::Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::TokenValidationError(e.to_string()),
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_jwt_service() -> JwtService {
        JwtService::new("test_secret_key_123".to_string(), 90)
    }

    #[test]
    fn test_generate_and_validate_token() {
        let service = create_test_jwt_service();
        let user_id = Uuid::new_v4();

        let token = service.generate_token(user_id).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.exp - claims.iat, Duration::days(90).num_seconds());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let service = create_test_jwt_service();
        let other = JwtService::new("another_secret".to_string(), 90);

        let token = other.generate_token(Uuid::new_v4()).unwrap();
        let result = service.validate_token(&token);

        assert!(matches!(result, Err(JwtError::TokenValidationError(_))));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = create_test_jwt_service();
        let mut token = service.generate_token(Uuid::new_v4()).unwrap();
        token.push('x');

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = create_test_jwt_service();
        let issued_at = Utc::now() - Duration::days(91);

        let token = service.generate_token_at(Uuid::new_v4(), issued_at).unwrap();
        let result = service.validate_token(&token);

        assert!(matches!(result, Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_malformed_token() {
        let service = create_test_jwt_service();
        assert!(service.validate_token("not-a-jwt").is_err());
    }
}
