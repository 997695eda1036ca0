//! Registration, credential checks and sessions.

mod password;
mod session;

use std::sync::Arc;

pub use password::PasswordHasher;
pub use session::{SessionAuthority, SESSION_COOKIE};

use crate::{
    error::{AppError, StoreError},
    model::UserId,
    store::Store,
};

pub struct Credentials {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
}

impl Credentials {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Stores a new user with a bcrypt digest of `password`.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserId, AppError> {
        let digest = self.hasher.hash(password).await?;

        match self.store.insert_user(username, &digest).await {
            Ok(user_id) => {
                tracing::info!(user_id, "user registered");
                Ok(user_id)
            }
            Err(StoreError::Duplicate) => Err(AppError::Conflict(format!(
                "Username {} is already taken",
                username
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the user id when `password` matches the stored digest.
    /// Unknown users and wrong passwords fail the same way.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserId, AppError> {
        let user = self.store.find_user(username).await?;
        let digest = user.as_ref().map(|u| u.password_digest.as_str());
        let verified = self.hasher.verify(password, digest).await?;

        match user {
            Some(user) if verified => Ok(user.id),
            _ => {
                tracing::warn!("failed login attempt");
                Err(AppError::InvalidCredentials)
            }
        }
    }
}
