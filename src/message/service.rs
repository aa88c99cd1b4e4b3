use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{models::MessageModel, repository::MessageRepository};
use crate::policy::ensure_owner;
use crate::shared::{AppError, AppState};

/// Author-gated message operations. Posting lives on the room service.
pub struct MessageService {
    repository: Arc<dyn MessageRepository + Send + Sync>,
}

impl MessageService {
    pub fn new(repository: Arc<dyn MessageRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.message_repository))
    }

    /// Loads a message and checks that `actor_id` wrote it
    #[instrument(skip(self))]
    pub async fn get_owned_message(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
    ) -> Result<MessageModel, AppError> {
        let message = self
            .repository
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

        ensure_owner(actor_id, &message)?;
        Ok(message)
    }

    #[instrument(skip(self))]
    pub async fn delete_message(&self, actor_id: Uuid, message_id: Uuid) -> Result<(), AppError> {
        let message = self.get_owned_message(actor_id, message_id).await?;
        self.repository.delete_message(message.id).await?;

        info!(message_id = %message.id, room_id = %message.room_id, "Message deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::repository::InMemoryMessageRepository;

    #[tokio::test]
    async fn test_only_author_may_delete() {
        let repo = Arc::new(InMemoryMessageRepository::new());
        let service = MessageService::new(repo.clone());
        let author = Uuid::new_v4();
        let message = MessageModel::new(author, Uuid::new_v4(), "hi".to_string());
        repo.create_message(&message).await.unwrap();

        let denied = service.delete_message(Uuid::new_v4(), message.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
        assert_eq!(repo.message_count().await, 1);

        service.delete_message(author, message.id).await.unwrap();
        assert_eq!(repo.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_message_is_not_found() {
        let service = MessageService::new(Arc::new(InMemoryMessageRepository::new()));

        let result = service.get_owned_message(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
