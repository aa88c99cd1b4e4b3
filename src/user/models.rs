use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: Uuid,
    pub username: String,      // Always stored lower-case
    pub password_hash: String, // bcrypt
    pub created_at: DateTime<Utc>,
}

impl UserModel {
    /// Creates a new user model with a generated ID
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_lowercase(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}
