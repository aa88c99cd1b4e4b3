use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::RoomModel;
use crate::shared::AppError;

/// Trait for room repository operations
#[async_trait]
pub trait RoomRepository {
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError>;
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError>;
    async fn get_rooms(&self, room_ids: &[Uuid]) -> Result<Vec<RoomModel>, AppError>;
    async fn update_room(&self, room: &RoomModel) -> Result<(), AppError>;

    /// Deletes the room together with its participant set
    async fn delete_room(&self, room_id: Uuid) -> Result<(), AppError>;

    /// Rooms whose name or description contains `query` (case-insensitive),
    /// or whose topic is one of `topic_ids`. Most recently updated first.
    async fn search_rooms(&self, query: &str, topic_ids: &[Uuid])
        -> Result<Vec<RoomModel>, AppError>;

    async fn list_rooms_by_host(&self, host_id: Uuid) -> Result<Vec<RoomModel>, AppError>;

    /// Adds `user_id` to the room's participants. Returns false if already present.
    async fn add_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Uuid>, AppError>;
}

fn newest_first(rooms: &mut [RoomModel]) {
    rooms.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then(b.created_at.cmp(&a.created_at))
    });
}

/// In-memory implementation of RoomRepository for development and testing
pub struct InMemoryRoomRepository {
    rooms: RwLock<HashMap<Uuid, RoomModel>>,
    participants: RwLock<HashMap<Uuid, Vec<Uuid>>>, // room_id -> user ids in join order
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            participants: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the current number of rooms in the repository
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        debug!(room_id = %room.id, host_id = %room.host_id, "Creating room in memory");

        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            warn!(room_id = %room.id, "Room already exists in memory");
            return Err(AppError::DatabaseError("Room already exists".to_string()));
        }
        rooms.insert(room.id, room.clone());

        debug!(room_id = %room.id, "Room created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        let room = self.rooms.read().await.get(&room_id).cloned();

        match &room {
            Some(r) => debug!(room_id = %room_id, name = %r.name, "Room found in memory"),
            None => debug!(room_id = %room_id, "Room not found in memory"),
        }

        Ok(room)
    }

    #[instrument(skip(self, room_ids))]
    async fn get_rooms(&self, room_ids: &[Uuid]) -> Result<Vec<RoomModel>, AppError> {
        let rooms = self.rooms.read().await;
        Ok(room_ids
            .iter()
            .filter_map(|id| rooms.get(id).cloned())
            .collect())
    }

    #[instrument(skip(self, room))]
    async fn update_room(&self, room: &RoomModel) -> Result<(), AppError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&room.id) {
            Some(existing) => {
                *existing = room.clone();
                debug!(room_id = %room.id, "Room updated in memory");
                Ok(())
            }
            None => {
                warn!(room_id = %room.id, "Room not found for update in memory");
                Err(AppError::NotFound("Room not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: Uuid) -> Result<(), AppError> {
        // Held across both maps so no participant lands in a removed room
        let mut rooms = self.rooms.write().await;
        if rooms.remove(&room_id).is_none() {
            warn!(room_id = %room_id, "Room not found for deletion in memory");
            return Err(AppError::NotFound("Room not found".to_string()));
        }
        self.participants.write().await.remove(&room_id);
        drop(rooms);

        info!(room_id = %room_id, "Room deleted from memory");
        Ok(())
    }

    #[instrument(skip(self, topic_ids))]
    async fn search_rooms(
        &self,
        query: &str,
        topic_ids: &[Uuid],
    ) -> Result<Vec<RoomModel>, AppError> {
        let topic_ids: HashSet<&Uuid> = topic_ids.iter().collect();

        let mut matched: Vec<RoomModel> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| topic_ids.contains(&room.topic_id) || room.matches_text(query))
            .cloned()
            .collect();
        newest_first(&mut matched);

        debug!(query = %query, matched = matched.len(), "Searched rooms in memory");
        Ok(matched)
    }

    #[instrument(skip(self))]
    async fn list_rooms_by_host(&self, host_id: Uuid) -> Result<Vec<RoomModel>, AppError> {
        let mut hosted: Vec<RoomModel> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.host_id == host_id)
            .cloned()
            .collect();
        newest_first(&mut hosted);
        Ok(hosted)
    }

    #[instrument(skip(self))]
    async fn add_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(&room_id) {
            return Err(AppError::NotFound("Room not found".to_string()));
        }

        let mut participants = self.participants.write().await;
        let members = participants.entry(room_id).or_default();
        if members.contains(&user_id) {
            return Ok(false);
        }
        members.push(user_id);

        debug!(room_id = %room_id, user_id = %user_id, "Participant added in memory");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .participants
            .read()
            .await
            .get(&room_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// PostgreSQL implementation of room repository
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds an ILIKE pattern that matches `query` literally anywhere in the column
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

const ROOM_COLUMNS: &str = "id, host_id, topic_id, name, description, created_at, updated_at";

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        warn!(error = %e, "{}", context);
        AppError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        debug!(room_id = %room.id, host_id = %room.host_id, "Creating room in database");

        sqlx::query(
            "INSERT INTO rooms (id, host_id, topic_id, name, description, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(room.id)
        .bind(room.host_id)
        .bind(room.topic_id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to create room in database"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch room from database"))
    }

    #[instrument(skip(self, room_ids))]
    async fn get_rooms(&self, room_ids: &[Uuid]) -> Result<Vec<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ANY($1)"
        ))
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch rooms from database"))
    }

    #[instrument(skip(self, room))]
    async fn update_room(&self, room: &RoomModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE rooms SET topic_id = $2, name = $3, description = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(room.id)
        .bind(room.topic_id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update room in database"))?;

        if result.rows_affected() == 0 {
            warn!(room_id = %room.id, "Room not found for update");
            return Err(AppError::NotFound("Room not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: Uuid) -> Result<(), AppError> {
        // messages and room_participants go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete room from database"))?;

        if result.rows_affected() == 0 {
            warn!(room_id = %room_id, "Room not found for deletion");
            return Err(AppError::NotFound("Room not found".to_string()));
        }

        info!(room_id = %room_id, "Room deleted from database");
        Ok(())
    }

    #[instrument(skip(self, topic_ids))]
    async fn search_rooms(
        &self,
        query: &str,
        topic_ids: &[Uuid],
    ) -> Result<Vec<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE topic_id = ANY($2) OR name ILIKE $1 OR description ILIKE $1
             ORDER BY updated_at DESC, created_at DESC"
        ))
        .bind(like_pattern(query))
        .bind(topic_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to search rooms"))
    }

    #[instrument(skip(self))]
    async fn list_rooms_by_host(&self, host_id: Uuid) -> Result<Vec<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE host_id = $1
             ORDER BY updated_at DESC, created_at DESC"
        ))
        .bind(host_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list rooms by host"))
    }

    #[instrument(skip(self))]
    async fn add_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO room_participants (room_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to add room participant"))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM room_participants WHERE room_id = $1 ORDER BY joined_at",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list room participants"))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
