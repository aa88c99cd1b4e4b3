// Public API - what other modules can use
pub use handlers::{
    create_room, create_room_page, delete_room, delete_room_page, home, post_message,
    update_room, update_room_page, view_room,
};
pub use service::RoomService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
