pub type UserId = i64;

// Data model representing a Todo item
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct Todo {
    pub id: i64,
    pub task: String,
    pub summary: String,
}

// Fields of a partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub task: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_digest: String,
}

/// Server-side session record. Only the digest of the cookie value is kept.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub token_digest: String,
    pub user_id: UserId,
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// The authenticated caller, attached to the request by the auth middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub(crate) user_id: UserId,
    pub(crate) session_id: String,
}
