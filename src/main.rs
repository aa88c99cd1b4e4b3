use forum::{
    message::repository::{InMemoryMessageRepository, PostgresMessageRepository},
    room::repository::{InMemoryRoomRepository, PostgresRoomRepository},
    session::{
        repository::{InMemorySessionRepository, PostgresSessionRepository},
        service::SessionService,
        token::TokenConfig,
    },
    topic::repository::{InMemoryTopicRepository, PostgresTopicRepository},
    user::repository::{InMemoryUserRepository, PostgresUserRepository},
    AppConfig, AppState, Templates,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting forum server");

    let config = AppConfig::from_env();
    let token_config = TokenConfig::from_config(&config);
    let templates = Templates::new()?;

    // Postgres when DATABASE_URL is set, otherwise everything lives in memory
    let app_state = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to database and applied migrations");

            AppState::new(
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresTopicRepository::new(pool.clone())),
                Arc::new(PostgresRoomRepository::new(pool.clone())),
                Arc::new(PostgresMessageRepository::new(pool.clone())),
                Arc::new(SessionService::new(
                    Arc::new(PostgresSessionRepository::new(pool)),
                    token_config,
                )),
                templates,
            )
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory storage");
            AppState::new(
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryTopicRepository::new()),
                Arc::new(InMemoryRoomRepository::new()),
                Arc::new(InMemoryMessageRepository::new()),
                Arc::new(SessionService::new(
                    Arc::new(InMemorySessionRepository::new()),
                    token_config,
                )),
                templates,
            )
        }
    }
    .with_secure_cookies(config.secure_cookies)
    .with_password_cost(config.password_cost);

    app_state.session_service.cleanup_expired_sessions().await?;

    let app = forum::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
