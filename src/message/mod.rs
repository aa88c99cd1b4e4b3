pub use handlers::{delete_message, delete_message_page};
pub use service::MessageService;

mod handlers;
pub mod models;
pub mod repository;
mod service;
