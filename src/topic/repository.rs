use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::TopicModel;
use crate::shared::AppError;

/// Trait for topic repository operations
#[async_trait]
pub trait TopicRepository {
    /// Returns the topic named `name`, creating it if it does not exist yet
    async fn upsert_topic(&self, name: &str) -> Result<TopicModel, AppError>;
    async fn list_topics(&self) -> Result<Vec<TopicModel>, AppError>;
    async fn get_topics(&self, topic_ids: &[Uuid]) -> Result<Vec<TopicModel>, AppError>;
}

/// In-memory implementation of TopicRepository for development and testing
pub struct InMemoryTopicRepository {
    topics: RwLock<HashMap<Uuid, TopicModel>>,
}

impl Default for InMemoryTopicRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTopicRepository {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TopicRepository for InMemoryTopicRepository {
    #[instrument(skip(self))]
    async fn upsert_topic(&self, name: &str) -> Result<TopicModel, AppError> {
        // Write lock held across lookup and insert so two callers can't both create
        let mut topics = self.topics.write().await;
        if let Some(existing) = topics.values().find(|t| t.name == name) {
            debug!(topic_id = %existing.id, name = %name, "Topic already exists in memory");
            return Ok(existing.clone());
        }

        let topic = TopicModel::new(name.to_string());
        topics.insert(topic.id, topic.clone());

        info!(topic_id = %topic.id, name = %name, "Topic created in memory");
        Ok(topic)
    }

    #[instrument(skip(self))]
    async fn list_topics(&self) -> Result<Vec<TopicModel>, AppError> {
        let mut topics: Vec<TopicModel> = self.topics.read().await.values().cloned().collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topics)
    }

    #[instrument(skip(self, topic_ids))]
    async fn get_topics(&self, topic_ids: &[Uuid]) -> Result<Vec<TopicModel>, AppError> {
        let topics = self.topics.read().await;
        Ok(topic_ids
            .iter()
            .filter_map(|id| topics.get(id).cloned())
            .collect())
    }
}

/// PostgreSQL implementation of topic repository
pub struct PostgresTopicRepository {
    pool: PgPool,
}

impl PostgresTopicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicRepository for PostgresTopicRepository {
    #[instrument(skip(self))]
    async fn upsert_topic(&self, name: &str) -> Result<TopicModel, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let topic = sqlx::query_as::<_, TopicModel>(
            "INSERT INTO topics (id, name) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, name = %name, "Failed to upsert topic");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(topic_id = %topic.id, name = %name, "Topic upserted");
        Ok(topic)
    }

    #[instrument(skip(self))]
    async fn list_topics(&self) -> Result<Vec<TopicModel>, AppError> {
        sqlx::query_as::<_, TopicModel>("SELECT id, name FROM topics ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to list topics");
                AppError::DatabaseError(e.to_string())
            })
    }

    #[instrument(skip(self, topic_ids))]
    async fn get_topics(&self, topic_ids: &[Uuid]) -> Result<Vec<TopicModel>, AppError> {
        sqlx::query_as::<_, TopicModel>("SELECT id, name FROM topics WHERE id = ANY($1)")
            .bind(topic_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch topics");
                AppError::DatabaseError(e.to_string())
            })
    }
}
