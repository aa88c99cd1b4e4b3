use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::types::RegisterForm;
use crate::shared::{AppError, AppState};
use crate::user::{models::UserModel, repository::UserRepository};

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// Registration, credential checks and account edits
pub struct AuthService {
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    password_cost: u32,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository + Send + Sync>, password_cost: u32) -> Self {
        Self {
            user_repository,
            password_cost,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.user_repository), state.password_cost)
    }

    /// Validates the form, hashes the password and stores the new user
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &RegisterForm) -> Result<UserModel, AppError> {
        let username = normalize_username(&form.username);

        let mut errors = validate_username(&username);
        errors.extend(validate_password(&form.password1, &form.password2));
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let hash = hash_password(form.password1.clone(), self.password_cost).await?;
        let user = UserModel::new(username, hash);
        self.user_repository.create_user(&user).await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Returns the user when the credentials match, `None` otherwise
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserModel>, AppError> {
        let username = normalize_username(username);
        let Some(user) = self.user_repository.get_user_by_username(&username).await? else {
            warn!(username = %username, "Login attempt for unknown user");
            return Ok(None);
        };

        if verify_password(password.to_string(), user.password_hash.clone()).await? {
            info!(user_id = %user.id, "Credentials accepted");
            Ok(Some(user))
        } else {
            warn!(user_id = %user.id, "Wrong password");
            Ok(None)
        }
    }

    #[instrument(skip(self))]
    pub async fn update_username(&self, user_id: Uuid, username: &str) -> Result<(), AppError> {
        let username = normalize_username(username);
        let errors = validate_username(&username);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.user_repository.update_username(user_id, &username).await?;
        info!(user_id = %user_id, username = %username, "Username updated");
        Ok(())
    }
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn validate_username(username: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if username.is_empty() {
        errors.push("Username is required.".to_string());
        return errors;
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        errors.push(format!(
            "Ensure the username has at most {} characters.",
            MAX_USERNAME_LEN
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }

    errors
}

pub fn validate_password(password1: &str, password2: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password1 != password2 {
        errors.push("The two password fields didn't match.".to_string());
    }
    if password1.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LEN
        ));
    }
    if !password1.is_empty() && password1.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }

    errors
}

// bcrypt is CPU bound; keep it off the async workers.
async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|_| AppError::Internal)?
        .map_err(AppError::from)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|_| AppError::Internal)?
        .map_err(AppError::from)
}
