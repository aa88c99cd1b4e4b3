use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::RoomModel,
    repository::RoomRepository,
    types::{MessageView, RoomForm, RoomPage, RoomView, SearchResults, UserActivity, UserRef},
};
use crate::message::{models::MessageModel, repository::MessageRepository};
use crate::policy::ensure_owner;
use crate::render::time_since;
use crate::shared::{AppError, AppState};
use crate::topic::repository::TopicRepository;
use crate::user::repository::UserRepository;

/// Service for room business logic: search, lifecycle, posting
pub struct RoomService {
    rooms: Arc<dyn RoomRepository + Send + Sync>,
    topics: Arc<dyn TopicRepository + Send + Sync>,
    messages: Arc<dyn MessageRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl RoomService {
    pub fn new(
        rooms: Arc<dyn RoomRepository + Send + Sync>,
        topics: Arc<dyn TopicRepository + Send + Sync>,
        messages: Arc<dyn MessageRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self {
            rooms,
            topics,
            messages,
            users,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.room_repository),
            Arc::clone(&state.topic_repository),
            Arc::clone(&state.message_repository),
            Arc::clone(&state.user_repository),
        )
    }

    /// Rooms whose topic, name or description contain `query`, plus the
    /// messages of rooms whose topic matches. The query is matched as given;
    /// only the empty query matches all.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<SearchResults, AppError> {
        let topics = self.topics.list_topics().await?;
        let matching_topics: HashSet<Uuid> = topics
            .iter()
            .filter(|topic| topic.matches(query))
            .map(|topic| topic.id)
            .collect();
        let topic_ids: Vec<Uuid> = matching_topics.iter().copied().collect();

        let rooms = self.rooms.search_rooms(query, &topic_ids).await?;
        let feed_rooms: Vec<Uuid> = rooms
            .iter()
            .filter(|room| matching_topics.contains(&room.topic_id))
            .map(|room| room.id)
            .collect();
        let messages = self.messages.list_messages_for_rooms(&feed_rooms).await?;

        debug!(
            room_count = rooms.len(),
            message_count = messages.len(),
            "Search complete"
        );

        let rooms_count = rooms.len();
        Ok(SearchResults {
            rooms: self.room_views(rooms).await?,
            rooms_count,
            room_messages: self.message_views(messages).await?,
            topics,
        })
    }

    /// Room with its conversation (oldest first) and participants
    #[instrument(skip(self))]
    pub async fn room_page(&self, room_id: Uuid) -> Result<RoomPage, AppError> {
        let room = self.get_room(room_id).await?;
        let messages = self.messages.list_room_messages(room_id).await?;

        let participant_ids = self.rooms.list_participants(room_id).await?;
        let names = self.usernames(&participant_ids).await?;
        let participants = participant_ids
            .iter()
            .map(|id| user_ref(&names, *id))
            .collect();

        let mut views = self.room_views(vec![room]).await?;
        let room = views.pop().ok_or(AppError::Internal)?;

        Ok(RoomPage {
            room,
            room_messages: self.message_views(messages).await?,
            participants,
        })
    }

    pub async fn get_room(&self, room_id: Uuid) -> Result<RoomModel, AppError> {
        self.rooms
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))
    }

    /// Loads a room and checks that `actor_id` hosts it
    #[instrument(skip(self))]
    pub async fn get_owned_room(&self, actor_id: Uuid, room_id: Uuid) -> Result<RoomModel, AppError> {
        let room = self.get_room(room_id).await?;
        ensure_owner(actor_id, &room)?;
        Ok(room)
    }

    #[instrument(skip(self, form), fields(name = %form.name, topic = %form.topic))]
    pub async fn create_room(&self, host_id: Uuid, form: &RoomForm) -> Result<RoomModel, AppError> {
        let (name, topic_name) = validate_room_form(form)?;
        let topic = self.topics.upsert_topic(&topic_name).await?;

        let room = RoomModel::new(host_id, topic.id, name, form.description.trim().to_string());
        self.rooms.create_room(&room).await?;

        info!(room_id = %room.id, host_id = %host_id, topic = %topic.name, "Room created");
        Ok(room)
    }

    #[instrument(skip(self, form), fields(name = %form.name, topic = %form.topic))]
    pub async fn update_room(
        &self,
        actor_id: Uuid,
        room_id: Uuid,
        form: &RoomForm,
    ) -> Result<RoomModel, AppError> {
        let mut room = self.get_owned_room(actor_id, room_id).await?;
        let (name, topic_name) = validate_room_form(form)?;
        let topic = self.topics.upsert_topic(&topic_name).await?;

        room.name = name;
        room.topic_id = topic.id;
        room.description = form.description.trim().to_string();
        room.touch();
        self.rooms.update_room(&room).await?;

        info!(room_id = %room.id, "Room updated");
        Ok(room)
    }

    /// Deletes the room together with its messages and participants
    #[instrument(skip(self))]
    pub async fn delete_room(&self, actor_id: Uuid, room_id: Uuid) -> Result<(), AppError> {
        let room = self.get_owned_room(actor_id, room_id).await?;

        // Room first: a post racing this delete then fails to join the room
        // and withdraws its message.
        self.rooms.delete_room(room.id).await?;
        let removed_messages = self.messages.delete_room_messages(room.id).await?;

        info!(room_id = %room.id, removed_messages, "Room deleted");
        Ok(())
    }

    /// Posts `body` to the room and records the author as a participant.
    /// A blank body posts nothing and returns `None`.
    #[instrument(skip(self, body))]
    pub async fn post_message(
        &self,
        author_id: Uuid,
        room_id: Uuid,
        body: &str,
    ) -> Result<Option<MessageModel>, AppError> {
        let room = self.get_room(room_id).await?;

        let body = body.trim();
        if body.is_empty() {
            debug!(room_id = %room.id, "Ignoring blank message");
            return Ok(None);
        }

        let message = MessageModel::new(author_id, room.id, body.to_string());
        self.messages.create_message(&message).await?;
        let joined = match self.rooms.add_participant(room.id, author_id).await {
            Ok(joined) => joined,
            Err(AppError::NotFound(reason)) => {
                warn!(room_id = %room.id, message_id = %message.id, "Room deleted while posting");
                if let Err(e) = self.messages.delete_message(message.id).await {
                    debug!(error = %e, "Message already purged with its room");
                }
                return Err(AppError::NotFound(reason));
            }
            Err(e) => return Err(e),
        };

        info!(
            message_id = %message.id,
            room_id = %room.id,
            new_participant = joined,
            "Message posted"
        );
        Ok(Some(message))
    }

    /// Rooms hosted and messages written by a user
    #[instrument(skip(self))]
    pub async fn user_activity(&self, user_id: Uuid) -> Result<UserActivity, AppError> {
        let rooms = self.rooms.list_rooms_by_host(user_id).await?;
        let messages = self.messages.list_user_messages(user_id).await?;

        Ok(UserActivity {
            rooms: self.room_views(rooms).await?,
            room_messages: self.message_views(messages).await?,
            topics: self.topics.list_topics().await?,
        })
    }

    pub async fn list_topics(&self) -> Result<Vec<crate::topic::models::TopicModel>, AppError> {
        self.topics.list_topics().await
    }

    /// Prefills the update form from a stored room
    pub async fn room_form(&self, room: &RoomModel) -> Result<RoomForm, AppError> {
        let topic = self
            .topics
            .get_topics(&[room.topic_id])
            .await?
            .into_iter()
            .next()
            .map(|topic| topic.name)
            .unwrap_or_default();

        Ok(RoomForm {
            name: room.name.clone(),
            description: room.description.clone(),
            topic,
        })
    }

    /// Joins rooms with their host, topic and participant count
    pub async fn room_views(&self, rooms: Vec<RoomModel>) -> Result<Vec<RoomView>, AppError> {
        let host_ids: Vec<Uuid> = rooms.iter().map(|room| room.host_id).collect();
        let names = self.usernames(&host_ids).await?;

        let topic_ids: Vec<Uuid> = rooms.iter().map(|room| room.topic_id).collect();
        let topics: HashMap<Uuid, String> = self
            .topics
            .get_topics(&topic_ids)
            .await?
            .into_iter()
            .map(|topic| (topic.id, topic.name))
            .collect();

        let now = Utc::now();
        let mut views = Vec::with_capacity(rooms.len());
        for room in rooms {
            let participant_count = self.rooms.list_participants(room.id).await?.len();
            views.push(RoomView {
                id: room.id,
                host: user_ref(&names, room.host_id),
                topic: topics.get(&room.topic_id).cloned().unwrap_or_default(),
                participant_count,
                created_since: time_since(room.created_at, now),
                name: room.name,
                description: room.description,
            });
        }
        Ok(views)
    }

    /// Joins messages with their author and room name
    pub async fn message_views(
        &self,
        messages: Vec<MessageModel>,
    ) -> Result<Vec<MessageView>, AppError> {
        let author_ids: Vec<Uuid> = messages.iter().map(|m| m.user_id).collect();
        let names = self.usernames(&author_ids).await?;

        let room_ids: Vec<Uuid> = messages
            .iter()
            .map(|m| m.room_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let room_names: HashMap<Uuid, String> = self
            .rooms
            .get_rooms(&room_ids)
            .await?
            .into_iter()
            .map(|room| (room.id, room.name))
            .collect();

        let now = Utc::now();
        Ok(messages
            .into_iter()
            .map(|message| MessageView {
                id: message.id,
                user: user_ref(&names, message.user_id),
                room_id: message.room_id,
                room_name: room_names.get(&message.room_id).cloned().unwrap_or_default(),
                created_since: time_since(message.created_at, now),
                body: message.body,
            })
            .collect())
    }

    async fn usernames(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        let unique: Vec<Uuid> = user_ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        Ok(self
            .users
            .get_users(&unique)
            .await?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect())
    }
}

fn user_ref(names: &HashMap<Uuid, String>, id: Uuid) -> UserRef {
    UserRef {
        id,
        username: names.get(&id).cloned().unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Trimmed room name and topic name; both are required
fn validate_room_form(form: &RoomForm) -> Result<(String, String), AppError> {
    let name = form.name.trim();
    let topic = form.topic.trim();

    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push("Room name is required.".to_string());
    }
    if topic.is_empty() {
        errors.push("Topic is required.".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok((name.to_string(), topic.to_string()))
}
