// Library crate for the forum server
// This file exposes the router and public API for main and integration tests

pub mod auth;
pub mod config;
pub mod message;
pub mod policy;
pub mod render;
pub mod room;
pub mod session;
pub mod shared;
pub mod topic;
pub mod user;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use render::Templates;
pub use room::{models::RoomModel, repository::RoomRepository};
pub use shared::{AppError, AppState};

/// Builds the application router with session loading and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(room::home))
        .route("/login/", get(auth::handlers::login_page).post(auth::handlers::login))
        .route(
            "/register/",
            get(auth::handlers::register_page).post(auth::handlers::register),
        )
        .route("/logout/", get(auth::handlers::logout).post(auth::handlers::logout))
        .route(
            "/update-user/",
            get(auth::handlers::update_user_page).post(auth::handlers::update_user),
        )
        .route("/profile/:id", get(user::profile))
        .route(
            "/create-room/",
            get(room::create_room_page).post(room::create_room),
        )
        .route("/room/:id", get(room::view_room).post(room::post_message))
        .route(
            "/update-room/:id",
            get(room::update_room_page).post(room::update_room),
        )
        .route(
            "/delete-room/:id",
            get(room::delete_room_page).post(room::delete_room),
        )
        .route(
            "/delete-message/:id",
            get(message::delete_message_page).post(message::delete_message),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::load_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
