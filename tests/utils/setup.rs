use std::sync::Arc;

use forum::{
    message::repository::InMemoryMessageRepository,
    room::repository::InMemoryRoomRepository,
    session::{
        repository::InMemorySessionRepository, service::SessionService, token::TokenConfig,
    },
    topic::repository::InMemoryTopicRepository,
    user::repository::InMemoryUserRepository,
    AppState, Templates,
};

use axum::Router;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// A full application wired to in-memory storage, plus a session cookie for
/// each user registered through the builder
pub struct TestSetup {
    pub state: AppState,
    pub app: Router,
    pub messages: Arc<InMemoryMessageRepository>,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub cookies: Vec<(String, String)>, // (username, cookie header)
}

pub struct TestSetupBuilder {
    users: Vec<String>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { users: vec![] }
    }

    pub fn with_users(mut self, users: Vec<&str>) -> Self {
        self.users = users.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_alice_and_bob(self) -> Self {
        self.with_users(vec!["alice", "bob"])
    }

    pub async fn build(self) -> TestSetup {
        let messages = Arc::new(InMemoryMessageRepository::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let session_service = SessionService::new(
            Arc::new(InMemorySessionRepository::new()),
            TokenConfig::with_secret("integration-secret", 1),
        );

        let state = AppState::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryTopicRepository::new()),
            rooms.clone(),
            messages.clone(),
            Arc::new(session_service),
            Templates::new().unwrap(),
        )
        .with_password_cost(4);

        let mut setup = TestSetup {
            app: forum::router(state.clone()),
            state,
            messages,
            rooms,
            cookies: vec![],
        };

        // Users sign up through the real registration form
        for user in &self.users {
            let cookie = setup.register(user, "correct-horse").await;
            setup.cookies.push((user.clone(), cookie));
        }

        setup
    }
}

impl TestSetup {
    /// Cookie header for a user registered by the builder
    pub fn cookie(&self, username: &str) -> &str {
        self.cookies
            .iter()
            .find(|(name, _)| name == username)
            .map(|(_, cookie)| cookie.as_str())
            .unwrap_or_else(|| panic!("{} was not registered in the setup", username))
    }
}
