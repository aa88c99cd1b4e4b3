pub use handlers::profile;

mod handlers;
pub mod models;
pub mod repository;
