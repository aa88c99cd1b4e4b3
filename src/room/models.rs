use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::policy::Owned;
use crate::topic::models::contains_ignore_case;

/// Database model for rooms table
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct RoomModel {
    pub id: Uuid,
    pub host_id: Uuid, // Only the host may edit or delete the room
    pub topic_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomModel {
    /// Creates a new room model with generated ID
    pub fn new(host_id: Uuid, topic_id: Uuid, name: String, description: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            host_id,
            topic_id,
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive match against the room's own text (not its topic)
    pub fn matches_text(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query) || contains_ignore_case(&self.description, query)
    }

    /// Marks the room as modified now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Owned for RoomModel {
    fn owner_id(&self) -> Uuid {
        self.host_id
    }

    fn kind(&self) -> &'static str {
        "room"
    }
}
