use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::SessionModel, repository::SessionRepository, token::TokenConfig,
    types::SessionClaims,
};
use crate::shared::AppError;
use crate::user::models::UserModel;

/// Service for issuing, validating and revoking login sessions
pub struct SessionService {
    token_config: TokenConfig,
    repository: Arc<dyn SessionRepository + Send + Sync>,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn SessionRepository + Send + Sync>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            token_config,
            repository,
        }
    }

    /// Stores a new session for `user` and returns the signed cookie value
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn start_session(&self, user: &UserModel) -> Result<String, AppError> {
        let session = SessionModel::new(
            user.id,
            user.username.clone(),
            self.token_config.expiration_days,
        );
        self.repository.create_session(&session).await?;

        let token = self.token_config.create_token(&session)?;

        info!(
            session_id = %session.id,
            username = %user.username,
            "Session started"
        );
        Ok(token)
    }

    /// Validates a session token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub async fn validate_session(&self, token: &str) -> Result<SessionClaims, AppError> {
        // First validate JWT token structure and signature
        let claims = self.token_config.validate_token(token)?;

        // Then validate session exists in database and hasn't been revoked
        match self.repository.get_session(claims.session_id).await? {
            Some(session_model) => {
                if session_model.is_expired() {
                    warn!(
                        session_id = %claims.session_id,
                        "Session found in database but has expired"
                    );
                    return Err(AppError::Unauthorized("Session has expired".to_string()));
                }

                Ok(claims)
            }
            None => {
                warn!(
                    session_id = %claims.session_id,
                    "Session not found in database - may have been revoked"
                );
                Err(AppError::Unauthorized(
                    "Session not found or has been revoked".to_string(),
                ))
            }
        }
    }

    /// Revokes a session by removing it from the database
    #[instrument(skip(self))]
    pub async fn revoke_session(&self, session_id: Uuid) -> Result<(), AppError> {
        self.repository.delete_session(session_id).await?;

        info!(session_id = %session_id, "Session revoked successfully");
        Ok(())
    }

    /// Cleans up expired sessions from the database
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let removed_count = self.repository.cleanup_expired_sessions().await?;

        info!(
            removed_sessions = removed_count,
            "Expired sessions cleanup completed"
        );
        Ok(removed_count)
    }
}
