use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::{models::SessionModel, types::SessionClaims};
use crate::config::AppConfig;
use crate::shared::AppError;

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_secret(&config.jwt_secret, config.session_expiration_days)
    }

    pub fn with_secret(secret: &str, expiration_days: i64) -> Self {
        Self {
            secret: secret.to_string(),
            expiration_days,
        }
    }

    /// Creates a new JWT token for the given session
    #[instrument(skip(self, session))]
    pub fn create_token(&self, session: &SessionModel) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::days(self.expiration_days)).timestamp() as usize;

        debug!(
            expiration_days = self.expiration_days,
            exp_timestamp = exp,
            "Creating JWT token with expiration"
        );

        let claims = SessionClaims {
            session_id: session.id,
            user_id: session.user_id,
            username: session.username.clone(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Validates a JWT token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                username = %data.claims.username,
                session_id = %data.claims.session_id,
                exp = data.claims.exp,
                "JWT token decoded successfully"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> SessionModel {
        SessionModel::new(Uuid::new_v4(), "alice".to_string(), 7)
    }

    #[test]
    fn test_create_and_validate_token() {
        let config = TokenConfig::with_secret("secret", 7);
        let session = session();

        let token = config.create_token(&session).unwrap();
        assert!(!token.is_empty());

        let claims = config.validate_token(&token).unwrap();
        assert_eq!(claims.session_id, session.id);
        assert_eq!(claims.user_id, session.user_id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let config = TokenConfig::with_secret("secret", 7);
        let result = config.validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_token_with_different_secret() {
        let signer = TokenConfig::with_secret("one-secret", 7);
        let verifier = TokenConfig::with_secret("another-secret", 7);

        let token = signer.create_token(&session()).unwrap();

        assert!(signer.validate_token(&token).is_ok());
        assert!(matches!(
            verifier.validate_token(&token),
            Err(AppError::JwtError(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = TokenConfig::with_secret("secret", -2);
        let token = config.create_token(&session()).unwrap();

        assert!(matches!(
            config.validate_token(&token),
            Err(AppError::JwtError(_))
        ));
    }
}
