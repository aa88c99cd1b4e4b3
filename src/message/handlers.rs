use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;
use uuid::Uuid;

use super::service::MessageService;
use crate::render::Page;
use crate::session::CurrentUser;
use crate::shared::{AppError, AppState};

/// GET /delete-message/:id - confirmation, author only
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn delete_message_page(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let message = MessageService::from_state(&state)
        .get_owned_message(current_user.id, message_id)
        .await?;

    let html = state.templates.render(
        "delete.html",
        Page::new(Some(&current_user))
            .with("obj", &message.body)
            .with("action", &format!("/delete-message/{}", message_id)),
    )?;
    Ok(html.into_response())
}

/// POST /delete-message/:id - author only
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn delete_message(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    MessageService::from_state(&state)
        .delete_message(current_user.id, message_id)
        .await?;

    Ok(Redirect::to("/").into_response())
}
