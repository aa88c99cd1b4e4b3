use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure carried in the session cookie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// The logged-in user as seen by handlers and templates
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    #[serde(skip)]
    pub session_id: Uuid,
}
