use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const ADMIN_ROLE: &str = "admin";

/// JWT-related errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Token validation failed: {0}")]
    TokenValidation(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token subject")]
    InvalidSubject,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::TokenValidation(err.to_string()),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret_key: String,
    pub access_token_expiry: Duration,
    pub algorithm: Algorithm,
}

impl JwtConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            access_token_expiry: Duration::hours(1),
            algorithm: Algorithm::HS256,
        }
    }
}

/// Validates the bearer tokens issued by the platform's auth provider.
/// Token issuance here is limited to operator tooling and tests.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        roles: Vec<String>,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.config.access_token_expiry).timestamp(),
            iat: now.timestamp(),
            roles,
        };

        encode(
            &Header::new(self.config.algorithm),
            &claims,
            &EncodingKey::from_secret(self.config.secret_key.as_bytes()),
        )
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::new(self.config.algorithm);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret_key.as_bytes()),
            &validation,
        )?;

        // Reject tokens whose subject is not a user id up front.
        data.claims.user_id()?;

        debug!(user_id = %data.claims.sub, "Token validated");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::new("test_secret_key_for_unit_testing_12345"))
    }

    #[test]
    fn test_generate_and_validate() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service
            .generate_access_token(user_id, vec!["admin".to_string()])
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service()
            .generate_access_token(Uuid::new_v4(), vec![])
            .unwrap();
        let other = JwtService::new(JwtConfig::new("another_secret"));

        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::TokenValidation(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let mut config = JwtConfig::new("test_secret_key_for_unit_testing_12345");
        config.access_token_expiry = Duration::hours(-2);
        let service = JwtService::new(config);

        let token = service.generate_access_token(Uuid::new_v4(), vec![]).unwrap();
        assert!(matches!(service.validate_token(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_token_without_roles_claim_is_not_admin() {
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": Uuid::new_v4().to_string(), "exp": now + 600, "iat": now }),
            &EncodingKey::from_secret(b"test_secret_key_for_unit_testing_12345"),
        )
        .unwrap();

        let claims = service().validate_token(&token).unwrap();
        assert!(claims.roles.is_empty());
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_non_admin_roles() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 0,
            iat: 0,
            roles: vec!["player".to_string()],
        };
        assert!(!claims.is_admin());
    }
}
