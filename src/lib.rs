//! A to-do list HTTP API with username/password registration, cookie
//! sessions, and todos isolated per user.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod route;
pub mod schema;
pub mod store;

use std::sync::Arc;

use crate::{
    auth::{Credentials, PasswordHasher, SessionAuthority},
    config::Config,
    error::AppError,
    store::Store,
};

// Struct representing the application state
pub struct AppState {
    pub credentials: Arc<Credentials>,
    pub sessions: SessionAuthority,
    pub store: Arc<dyn Store>,
    pub cookie_secure: bool,
}

impl AppState {
    pub async fn new(store: Arc<dyn Store>, config: &Config) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.password_cost).await?;
        let credentials = Arc::new(Credentials::new(store.clone(), hasher));
        let sessions = SessionAuthority::new(store.clone(), credentials.clone(), config.session_ttl);

        Ok(Self {
            credentials,
            sessions,
            store,
            cookie_secure: config.cookie_secure,
        })
    }
}
