use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::policy::Owned;

/// Database model for messages table
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct MessageModel {
    pub id: Uuid,
    pub user_id: Uuid, // Author; the only user allowed to delete it
    pub room_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageModel {
    pub fn new(user_id: Uuid, room_id: Uuid, body: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            body,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Owned for MessageModel {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn kind(&self) -> &'static str {
        "message"
    }
}
