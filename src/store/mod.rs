//! Persistence seams for users, sessions and todos.
//!
//! Every operation that checks a precondition and then writes (unique username,
//! unique todo id per owner) is a single call here so backends can make it
//! atomic: SQLite through its key constraints, the memory backend through one
//! lock.

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::{
    error::StoreError,
    model::{Session, Todo, TodoPatch, User, UserId},
};

/// Value of `DATABASE_URL` selecting the in-process backend.
pub const MEMORY_BACKEND: &str = "memory";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn insert_user(&self, username: &str, password_digest: &str)
        -> Result<UserId, StoreError>;

    /// Exact, case-sensitive lookup.
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    async fn find_session(&self, token_digest: &str) -> Result<Option<Session>, StoreError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, token_digest: &str) -> Result<bool, StoreError>;

    /// Removes sessions with `expires_at <= now`, returning how many went away.
    async fn purge_expired_sessions(&self, now: i64) -> Result<u64, StoreError>;
}

/// Todo persistence. Every call is scoped to an owner; records of other owners
/// are invisible.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the owner already has `todo.id`.
    async fn insert_todo(&self, owner: UserId, todo: &Todo) -> Result<(), StoreError>;

    async fn fetch_todo(&self, owner: UserId, id: i64) -> Result<Option<Todo>, StoreError>;

    async fn fetch_todos(&self, owner: UserId) -> Result<Vec<Todo>, StoreError>;

    async fn update_todo(
        &self,
        owner: UserId,
        id: i64,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;

    async fn delete_todo(&self, owner: UserId, id: i64) -> Result<bool, StoreError>;
}

pub trait Store: CredentialStore + SessionStore + TodoStore {}

impl<T> Store for T where T: CredentialStore + SessionStore + TodoStore {}

/// Opens the backend named by `database_url`.
pub async fn open(database_url: &str) -> Result<Arc<dyn Store>, StoreError> {
    if database_url == MEMORY_BACKEND {
        tracing::info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = SqliteStore::connect(database_url).await?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backends() -> Vec<(&'static str, Arc<dyn Store>)> {
        vec![
            ("memory", open(MEMORY_BACKEND).await.unwrap()),
            ("sqlite", open("sqlite::memory:").await.unwrap()),
        ]
    }

    fn todo(id: i64, task: &str, summary: &str) -> Todo {
        Todo {
            id,
            task: task.to_string(),
            summary: summary.to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        for (name, store) in backends().await {
            let id = store.insert_user("alice", "digest-1").await.unwrap();
            let err = store.insert_user("alice", "digest-2").await.unwrap_err();
            assert!(matches!(err, StoreError::Duplicate), "{name}");

            let user = store.find_user("alice").await.unwrap().unwrap();
            assert_eq!(user.id, id, "{name}");
            assert_eq!(user.password_digest, "digest-1", "{name}");
        }
    }

    #[tokio::test]
    async fn test_username_lookup_is_case_sensitive() {
        for (name, store) in backends().await {
            store.insert_user("alice", "digest").await.unwrap();
            assert!(store.find_user("Alice").await.unwrap().is_none(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_sessions_lifecycle() {
        for (name, store) in backends().await {
            let user = store.insert_user("alice", "digest").await.unwrap();
            let live = Session {
                token_digest: "live".into(),
                user_id: user,
                expires_at: 200,
            };
            let stale = Session {
                token_digest: "stale".into(),
                user_id: user,
                expires_at: 50,
            };
            store.insert_session(&live).await.unwrap();
            store.insert_session(&stale).await.unwrap();

            let found = store.find_session("live").await.unwrap().unwrap();
            assert_eq!(found.user_id, user, "{name}");

            assert_eq!(store.purge_expired_sessions(100).await.unwrap(), 1, "{name}");
            assert!(store.find_session("stale").await.unwrap().is_none(), "{name}");

            assert!(store.delete_session("live").await.unwrap(), "{name}");
            assert!(!store.delete_session("live").await.unwrap(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_todos_are_scoped_to_owner() {
        for (name, store) in backends().await {
            let alice = store.insert_user("alice", "a").await.unwrap();
            let bob = store.insert_user("bob", "b").await.unwrap();

            store.insert_todo(alice, &todo(1, "write code", "s")).await.unwrap();
            assert!(store.fetch_todo(bob, 1).await.unwrap().is_none(), "{name}");
            assert!(store.fetch_todos(bob).await.unwrap().is_empty(), "{name}");
            assert!(!store.delete_todo(bob, 1).await.unwrap(), "{name}");
            assert!(store
                .update_todo(bob, 1, &TodoPatch::default())
                .await
                .unwrap()
                .is_none());

            // Same id under another owner is a separate record.
            store.insert_todo(bob, &todo(1, "other", "t")).await.unwrap();
            let mine = store.fetch_todo(alice, 1).await.unwrap().unwrap();
            assert_eq!(mine.task, "write code", "{name}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_todo_keeps_first_record() {
        for (name, store) in backends().await {
            let alice = store.insert_user("alice", "a").await.unwrap();
            store.insert_todo(alice, &todo(1, "first", "s")).await.unwrap();

            let err = store
                .insert_todo(alice, &todo(1, "second", "s"))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Duplicate), "{name}");
            assert_eq!(
                store.fetch_todo(alice, 1).await.unwrap().unwrap().task,
                "first",
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn test_partial_update_and_delete() {
        for (name, store) in backends().await {
            let alice = store.insert_user("alice", "a").await.unwrap();
            store.insert_todo(alice, &todo(7, "task", "s")).await.unwrap();

            let patch = TodoPatch {
                task: None,
                summary: Some("s2".into()),
            };
            let updated = store.update_todo(alice, 7, &patch).await.unwrap().unwrap();
            assert_eq!(updated, todo(7, "task", "s2"), "{name}");

            let mut all = store.fetch_todos(alice).await.unwrap();
            all.sort_by_key(|t| t.id);
            assert_eq!(all, vec![todo(7, "task", "s2")], "{name}");

            assert!(store.delete_todo(alice, 7).await.unwrap(), "{name}");
            assert!(store.fetch_todo(alice, 7).await.unwrap().is_none(), "{name}");
        }
    }
}
