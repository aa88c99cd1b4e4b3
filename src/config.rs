use std::env;
use std::str::FromStr;

/// Runtime configuration, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string. When absent the in-memory repositories are used.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub session_expiration_days: i64,
    pub secure_cookies: bool,
    /// bcrypt work factor for new password hashes
    pub password_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            session_expiration_days: parse_var("SESSION_EXPIRATION_DAYS", 14),
            secure_cookies: parse_var("SECURE_COOKIES", false),
            password_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
