use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::MessageModel;
use crate::shared::AppError;

/// Trait for message repository operations
#[async_trait]
pub trait MessageRepository {
    async fn create_message(&self, message: &MessageModel) -> Result<(), AppError>;
    async fn get_message(&self, message_id: Uuid) -> Result<Option<MessageModel>, AppError>;
    async fn delete_message(&self, message_id: Uuid) -> Result<(), AppError>;

    /// Messages of one room, oldest first
    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<MessageModel>, AppError>;

    /// Messages posted in any of `room_ids`, newest first
    async fn list_messages_for_rooms(
        &self,
        room_ids: &[Uuid],
    ) -> Result<Vec<MessageModel>, AppError>;

    /// Messages written by one user, newest first
    async fn list_user_messages(&self, user_id: Uuid) -> Result<Vec<MessageModel>, AppError>;

    /// Removes every message of a room, returning how many were removed
    async fn delete_room_messages(&self, room_id: Uuid) -> Result<u64, AppError>;
}

fn newest_first(messages: &mut [MessageModel]) {
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// In-memory implementation of MessageRepository for development and testing
pub struct InMemoryMessageRepository {
    messages: RwLock<HashMap<Uuid, MessageModel>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the current number of messages in the repository
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &MessageModel) -> Result<(), AppError> {
        debug!(message_id = %message.id, room_id = %message.room_id, "Creating message in memory");

        let mut messages = self.messages.write().await;
        if messages.contains_key(&message.id) {
            warn!(message_id = %message.id, "Message already exists in memory");
            return Err(AppError::DatabaseError("Message already exists".to_string()));
        }
        messages.insert(message.id, message.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_message(&self, message_id: Uuid) -> Result<Option<MessageModel>, AppError> {
        Ok(self.messages.read().await.get(&message_id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_message(&self, message_id: Uuid) -> Result<(), AppError> {
        if self.messages.write().await.remove(&message_id).is_none() {
            warn!(message_id = %message_id, "Message not found for deletion in memory");
            return Err(AppError::NotFound("Message not found".to_string()));
        }

        debug!(message_id = %message_id, "Message deleted from memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<MessageModel>, AppError> {
        let mut messages: Vec<MessageModel> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    #[instrument(skip(self, room_ids))]
    async fn list_messages_for_rooms(
        &self,
        room_ids: &[Uuid],
    ) -> Result<Vec<MessageModel>, AppError> {
        let room_ids: HashSet<&Uuid> = room_ids.iter().collect();
        let mut messages: Vec<MessageModel> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| room_ids.contains(&m.room_id))
            .cloned()
            .collect();
        newest_first(&mut messages);
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn list_user_messages(&self, user_id: Uuid) -> Result<Vec<MessageModel>, AppError> {
        let mut messages: Vec<MessageModel> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut messages);
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn delete_room_messages(&self, room_id: Uuid) -> Result<u64, AppError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|_, m| m.room_id != room_id);
        let removed = (before - messages.len()) as u64;

        info!(room_id = %room_id, removed, "Room messages deleted from memory");
        Ok(removed)
    }
}

/// PostgreSQL implementation of message repository
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MESSAGE_COLUMNS: &str = "id, user_id, room_id, body, created_at, updated_at";

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        warn!(error = %e, "{}", context);
        AppError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &MessageModel) -> Result<(), AppError> {
        debug!(message_id = %message.id, room_id = %message.room_id, "Creating message in database");

        sqlx::query(
            "INSERT INTO messages (id, user_id, room_id, body, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(message.id)
        .bind(message.user_id)
        .bind(message.room_id)
        .bind(&message.body)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to create message in database"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_message(&self, message_id: Uuid) -> Result<Option<MessageModel>, AppError> {
        sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch message from database"))
    }

    #[instrument(skip(self))]
    async fn delete_message(&self, message_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete message from database"))?;

        if result.rows_affected() == 0 {
            warn!(message_id = %message_id, "Message not found for deletion");
            return Err(AppError::NotFound("Message not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_room_messages(&self, room_id: Uuid) -> Result<Vec<MessageModel>, AppError> {
        sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = $1 ORDER BY created_at"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list room messages"))
    }

    #[instrument(skip(self, room_ids))]
    async fn list_messages_for_rooms(
        &self,
        room_ids: &[Uuid],
    ) -> Result<Vec<MessageModel>, AppError> {
        sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = ANY($1)
             ORDER BY created_at DESC"
        ))
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list messages for rooms"))
    }

    #[instrument(skip(self))]
    async fn list_user_messages(&self, user_id: Uuid) -> Result<Vec<MessageModel>, AppError> {
        sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list user messages"))
    }

    #[instrument(skip(self))]
    async fn delete_room_messages(&self, room_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete room messages"))?;

        Ok(result.rows_affected())
    }
}
