use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::topic::models::TopicModel;

/// Create/update room form
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct RoomForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic: String,
}

/// Message posted from the room page
#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub body: String,
}

/// Home page query string, `?q=`
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// A user reference as templates need it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub host: UserRef,
    pub topic: String,
    pub participant_count: usize,
    pub created_since: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub body: String,
    pub user: UserRef,
    pub room_id: Uuid,
    pub room_name: String,
    pub created_since: String,
}

/// Everything the home page shows
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub rooms: Vec<RoomView>,
    pub rooms_count: usize,
    pub room_messages: Vec<MessageView>,
    pub topics: Vec<TopicModel>,
}

/// Everything the room page shows
#[derive(Debug, Serialize)]
pub struct RoomPage {
    pub room: RoomView,
    pub room_messages: Vec<MessageView>,
    pub participants: Vec<UserRef>,
}

/// A user's rooms and messages, for the profile page
#[derive(Debug, Serialize)]
pub struct UserActivity {
    pub rooms: Vec<RoomView>,
    pub room_messages: Vec<MessageView>,
    pub topics: Vec<TopicModel>,
}
