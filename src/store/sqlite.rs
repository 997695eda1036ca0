use async_trait::async_trait;
use sqlx::{
    migrate::MigrateDatabase, query, query_as, query_scalar, sqlite::SqlitePoolOptions, Pool,
    Sqlite,
};

use super::{CredentialStore, SessionStore, TodoStore};
use crate::{
    error::StoreError,
    model::{Session, Todo, TodoPatch, User, UserId},
};

const SCHEMA: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_digest TEXT NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS sessions (
        token_digest TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at INTEGER NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS todos (
        owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        id INTEGER NOT NULL,
        task TEXT NOT NULL,
        summary TEXT NOT NULL,
        PRIMARY KEY (owner_id, id)
    );"#,
];

/// Relational backend on a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connects to `database_url`, creating the database file and the tables
    /// when they do not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        if !in_memory && !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            tracing::info!("Creating database {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        // Every connection to an in-memory database sees its own empty copy,
        // so keep exactly one alive for the lifetime of the pool.
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(10)
        };
        let db = options.connect(database_url).await?;

        for statement in SCHEMA {
            query(statement).execute(&db).await?;
        }
        tracing::debug!("database schema ready");

        Ok(Self { db })
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn insert_user(
        &self,
        username: &str,
        password_digest: &str,
    ) -> Result<UserId, StoreError> {
        query_scalar::<_, i64>(
            "INSERT INTO users (username, password_digest) VALUES (?, ?) RETURNING id",
        )
        .bind(username)
        .bind(password_digest)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = query_as::<_, User>(
            "SELECT id, username, password_digest FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        query("INSERT INTO sessions (token_digest, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token_digest)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.db)
            .await
            .map_err(map_unique_violation)?;
        Ok(())
    }

    async fn find_session(&self, token_digest: &str) -> Result<Option<Session>, StoreError> {
        let session = query_as::<_, Session>(
            "SELECT token_digest, user_id, expires_at FROM sessions WHERE token_digest = ?",
        )
        .bind(token_digest)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token_digest: &str) -> Result<bool, StoreError> {
        let rows_affected = query("DELETE FROM sessions WHERE token_digest = ?")
            .bind(token_digest)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn purge_expired_sessions(&self, now: i64) -> Result<u64, StoreError> {
        let rows_affected = query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(rows_affected)
    }
}

#[async_trait]
impl TodoStore for SqliteStore {
    async fn insert_todo(&self, owner: UserId, todo: &Todo) -> Result<(), StoreError> {
        // The (owner_id, id) primary key turns a concurrent duplicate into a
        // constraint violation instead of a second row.
        query("INSERT INTO todos (owner_id, id, task, summary) VALUES (?, ?, ?, ?)")
            .bind(owner)
            .bind(todo.id)
            .bind(&todo.task)
            .bind(&todo.summary)
            .execute(&self.db)
            .await
            .map_err(map_unique_violation)?;
        Ok(())
    }

    async fn fetch_todo(&self, owner: UserId, id: i64) -> Result<Option<Todo>, StoreError> {
        let todo = query_as::<_, Todo>(
            "SELECT id, task, summary FROM todos WHERE owner_id = ? AND id = ?",
        )
        .bind(owner)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn fetch_todos(&self, owner: UserId) -> Result<Vec<Todo>, StoreError> {
        let todos = query_as::<_, Todo>("SELECT id, task, summary FROM todos WHERE owner_id = ?")
            .bind(owner)
            .fetch_all(&self.db)
            .await?;
        Ok(todos)
    }

    async fn update_todo(
        &self,
        owner: UserId,
        id: i64,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let todo = query_as::<_, Todo>(
            "UPDATE todos SET task = COALESCE(?, task), summary = COALESCE(?, summary) \
             WHERE owner_id = ? AND id = ? RETURNING id, task, summary",
        )
        .bind(patch.task.as_deref())
        .bind(patch.summary.as_deref())
        .bind(owner)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn delete_todo(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        let rows_affected = query("DELETE FROM todos WHERE owner_id = ? AND id = ?")
            .bind(owner)
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
