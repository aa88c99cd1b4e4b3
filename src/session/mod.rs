// Public API - what other modules can use
pub use middleware::{expired_session_cookie, load_session, session_cookie, SESSION_COOKIE};
pub use types::{CurrentUser, SessionClaims};

// Internal modules
mod middleware;
pub mod models;
pub mod repository;
pub mod service;
pub mod token;
mod types;
