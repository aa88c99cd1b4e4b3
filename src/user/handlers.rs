use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::render::Page;
use crate::room::{types::UserRef, RoomService};
use crate::session::CurrentUser;
use crate::shared::{AppError, AppState};

/// GET /profile/:id - a user's rooms and messages
#[instrument(skip(state, current_user))]
pub async fn profile(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = state
        .user_repository
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    let activity = RoomService::from_state(&state).user_activity(user.id).await?;
    info!(
        username = %user.username,
        rooms = activity.rooms.len(),
        messages = activity.room_messages.len(),
        "Profile viewed"
    );

    let html = state.templates.render(
        "profile.html",
        Page::new(current_user.as_ref())
            .with(
                "user",
                &UserRef {
                    id: user.id,
                    username: user.username,
                },
            )
            .with("rooms", &activity.rooms)
            .with("rooms_count", &activity.rooms.len())
            .with("room_messages", &activity.room_messages)
            .with("topics", &activity.topics),
    )?;
    Ok(html.into_response())
}
