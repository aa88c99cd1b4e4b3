use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for topics table. `name` is unique.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct TopicModel {
    pub id: Uuid,
    pub name: String,
}

impl TopicModel {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
        }
    }

    /// Case-insensitive substring match used by search
    pub fn matches(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query)
    }
}

/// Case-insensitive substring test. The empty query matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
