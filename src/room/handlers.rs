use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    service::RoomService,
    types::{MessageForm, RoomForm, SearchQuery},
};
use crate::render::Page;
use crate::session::CurrentUser;
use crate::shared::{AppError, AppState};

/// GET / - room search and activity feed
#[instrument(skip(state, current_user))]
pub async fn home(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let q = query.q.unwrap_or_default();
    let results = RoomService::from_state(&state).search(&q).await?;

    info!(rooms_count = results.rooms_count, "Home page listed");

    let html = state.templates.render(
        "home.html",
        Page::new(current_user.as_ref())
            .with("q", &q)
            .with("rooms", &results.rooms)
            .with("rooms_count", &results.rooms_count)
            .with("room_messages", &results.room_messages)
            .with("topics", &results.topics),
    )?;
    Ok(html.into_response())
}

/// GET /room/:id
#[instrument(skip(state, current_user))]
pub async fn view_room(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Path(room_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let page = RoomService::from_state(&state).room_page(room_id).await?;

    let html = state.templates.render(
        "room.html",
        Page::new(current_user.as_ref())
            .with("room", &page.room)
            .with("room_messages", &page.room_messages)
            .with("participants", &page.participants),
    )?;
    Ok(html.into_response())
}

/// POST /room/:id - posts a message and returns to the room
#[instrument(skip(state, form), fields(user_id = %current_user.id))]
pub async fn post_message(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(room_id): Path<Uuid>,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    RoomService::from_state(&state)
        .post_message(current_user.id, room_id, &form.body)
        .await?;

    Ok(Redirect::to(&format!("/room/{}", room_id)).into_response())
}

async fn room_form_page(
    state: &AppState,
    current_user: &CurrentUser,
    action: &str,
    form: &RoomForm,
    flash: &[String],
) -> Result<Response, AppError> {
    let topics = RoomService::from_state(state).list_topics().await?;
    let html = state.templates.render(
        "room_form.html",
        Page::new(Some(current_user))
            .with("action", action)
            .with("form", form)
            .with("topics", &topics)
            .flash(flash),
    )?;
    Ok(html.into_response())
}

/// GET /create-room/
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn create_room_page(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Response, AppError> {
    room_form_page(&state, &current_user, "/create-room/", &RoomForm::default(), &[]).await
}

/// POST /create-room/
#[instrument(skip(state, form), fields(user_id = %current_user.id))]
pub async fn create_room(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Form(form): Form<RoomForm>,
) -> Result<Response, AppError> {
    match RoomService::from_state(&state)
        .create_room(current_user.id, &form)
        .await
    {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(AppError::Validation(errors)) => {
            room_form_page(&state, &current_user, "/create-room/", &form, &errors).await
        }
        Err(e) => Err(e),
    }
}

/// GET /update-room/:id - host only
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn update_room_page(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(room_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let service = RoomService::from_state(&state);
    let room = service.get_owned_room(current_user.id, room_id).await?;
    let form = service.room_form(&room).await?;

    let action = format!("/update-room/{}", room_id);
    room_form_page(&state, &current_user, &action, &form, &[]).await
}

/// POST /update-room/:id - host only
#[instrument(skip(state, form), fields(user_id = %current_user.id))]
pub async fn update_room(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(room_id): Path<Uuid>,
    Form(form): Form<RoomForm>,
) -> Result<Response, AppError> {
    match RoomService::from_state(&state)
        .update_room(current_user.id, room_id, &form)
        .await
    {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(AppError::Validation(errors)) => {
            let action = format!("/update-room/{}", room_id);
            room_form_page(&state, &current_user, &action, &form, &errors).await
        }
        Err(e) => Err(e),
    }
}

/// GET /delete-room/:id - confirmation, host only
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn delete_room_page(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(room_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let room = RoomService::from_state(&state)
        .get_owned_room(current_user.id, room_id)
        .await?;

    let html = state.templates.render(
        "delete.html",
        Page::new(Some(&current_user))
            .with("obj", &room.name)
            .with("action", &format!("/delete-room/{}", room_id)),
    )?;
    Ok(html.into_response())
}

/// POST /delete-room/:id - host only
#[instrument(skip(state), fields(user_id = %current_user.id))]
pub async fn delete_room(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(room_id): Path<Uuid>,
) -> Result<Response, AppError> {
    RoomService::from_state(&state)
        .delete_room(current_user.id, room_id)
        .await?;

    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::repository::{InMemoryRoomRepository, RoomRepository};
    use crate::shared::test_utils::{seed_user, session_cookie, AppStateBuilder};
    use crate::shared::NOT_AUTHORIZED;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_create_room_then_listed_on_home() {
        let state = AppStateBuilder::new().build();
        let alice = seed_user(&state, "alice").await;
        let cookie = session_cookie(&state, &alice).await;

        let response = crate::router(state.clone())
            .oneshot(post("/create-room/", &cookie, "name=Jazz+Chat&topic=music&description="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = crate::router(state).oneshot(get("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Jazz Chat"));
        assert!(body.contains("1 rooms available"));
    }

    #[tokio::test]
    async fn test_create_room_missing_topic_rerenders() {
        let room_repository = Arc::new(InMemoryRoomRepository::new());
        let state = AppStateBuilder::new()
            .with_room_repository(room_repository.clone())
            .build();
        let alice = seed_user(&state, "alice").await;
        let cookie = session_cookie(&state, &alice).await;

        let response = crate::router(state)
            .oneshot(post("/create-room/", &cookie, "name=Jazz+Chat&topic="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Topic is required."));
        assert_eq!(room_repository.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_room_page_requires_login() {
        let state = AppStateBuilder::new().build();

        let response = crate::router(state)
            .oneshot(get("/create-room/", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login/?next=/create-room/"
        );
    }

    #[tokio::test]
    async fn test_update_room_denied_for_non_host() {
        let room_repository = Arc::new(InMemoryRoomRepository::new());
        let state = AppStateBuilder::new()
            .with_room_repository(room_repository.clone())
            .build();
        let alice = seed_user(&state, "alice").await;
        let bob = seed_user(&state, "bob").await;
        let room = RoomService::from_state(&state)
            .create_room(
                alice.id,
                &RoomForm {
                    name: "Jazz Chat".to_string(),
                    description: String::new(),
                    topic: "music".to_string(),
                },
            )
            .await
            .unwrap();
        let bob_cookie = session_cookie(&state, &bob).await;

        let uri = format!("/update-room/{}", room.id);
        let response = crate::router(state.clone())
            .oneshot(post(&uri, &bob_cookie, "name=Hijacked&topic=music"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, NOT_AUTHORIZED);

        let stored = room_repository.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Jazz Chat");

        let response = crate::router(state)
            .oneshot(get(&uri, Some(&bob_cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_room_page_prefilled_for_host() {
        let state = AppStateBuilder::new().build();
        let alice = seed_user(&state, "alice").await;
        let room = RoomService::from_state(&state)
            .create_room(
                alice.id,
                &RoomForm {
                    name: "Jazz Chat".to_string(),
                    description: "late night".to_string(),
                    topic: "music".to_string(),
                },
            )
            .await
            .unwrap();
        let cookie = session_cookie(&state, &alice).await;

        let response = crate::router(state)
            .oneshot(get(&format!("/update-room/{}", room.id), Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("value=\"Jazz Chat\""));
        assert!(body.contains("late night"));
        assert!(body.contains("value=\"music\""));
    }

    #[tokio::test]
    async fn test_post_message_redirects_back_to_room() {
        let state = AppStateBuilder::new().build();
        let alice = seed_user(&state, "alice").await;
        let room = RoomService::from_state(&state)
            .create_room(
                alice.id,
                &RoomForm {
                    name: "Jazz Chat".to_string(),
                    description: String::new(),
                    topic: "music".to_string(),
                },
            )
            .await
            .unwrap();
        let cookie = session_cookie(&state, &alice).await;

        let uri = format!("/room/{}", room.id);
        let response = crate::router(state.clone())
            .oneshot(post(&uri, &cookie, "body=hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], uri.as_str());

        let participants = state.room_repository.list_participants(room.id).await.unwrap();
        assert_eq!(participants, vec![alice.id]);

        let response = crate::router(state).oneshot(get(&uri, None)).await.unwrap();
        let body = body_text(response).await;
        assert!(body.contains("hi"));
        assert!(body.contains("@alice"));
    }

    #[tokio::test]
    async fn test_view_missing_room_is_not_found() {
        let state = AppStateBuilder::new().build();

        let response = crate::router(state.clone())
            .oneshot(get(&format!("/room/{}", Uuid::new_v4()), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = crate::router(state)
            .oneshot(get("/room/not-a-uuid", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_room_confirm_then_delete() {
        let room_repository = Arc::new(InMemoryRoomRepository::new());
        let state = AppStateBuilder::new()
            .with_room_repository(room_repository.clone())
            .build();
        let alice = seed_user(&state, "alice").await;
        let room = RoomService::from_state(&state)
            .create_room(
                alice.id,
                &RoomForm {
                    name: "Jazz Chat".to_string(),
                    description: String::new(),
                    topic: "music".to_string(),
                },
            )
            .await
            .unwrap();
        let cookie = session_cookie(&state, &alice).await;
        let uri = format!("/delete-room/{}", room.id);

        let response = crate::router(state.clone())
            .oneshot(get(&uri, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Jazz Chat"));
        assert_eq!(room_repository.room_count().await, 1);

        let response = crate::router(state)
            .oneshot(post(&uri, &cookie, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(room_repository.room_count().await, 0);
    }
}
