use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CredentialStore, SessionStore, TodoStore};
use crate::{
    error::StoreError,
    model::{Session, Todo, TodoPatch, User, UserId},
};

#[derive(Debug, Default)]
struct Tables {
    next_user_id: UserId,
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    todos: HashMap<(UserId, i64), Todo>,
}

/// In-process backend. A single lock guards all tables, so every
/// check-then-write runs as one critical section.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(
        &self,
        username: &str,
        password_digest: &str,
    ) -> Result<UserId, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.contains_key(username) {
            return Err(StoreError::Duplicate);
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            username: username.to_string(),
            password_digest: password_digest.to_string(),
        };
        let id = user.id;
        tables.users.insert(user.username.clone(), user);
        Ok(id)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(username).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.sessions.contains_key(&session.token_digest) {
            return Err(StoreError::Duplicate);
        }
        tables
            .sessions
            .insert(session.token_digest.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_digest: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.lock().await.sessions.get(token_digest).cloned())
    }

    async fn delete_session(&self, token_digest: &str) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .sessions
            .remove(token_digest)
            .is_some())
    }

    async fn purge_expired_sessions(&self, now: i64) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert_todo(&self, owner: UserId, todo: &Todo) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let key = (owner, todo.id);
        if tables.todos.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        tables.todos.insert(key, todo.clone());
        Ok(())
    }

    async fn fetch_todo(&self, owner: UserId, id: i64) -> Result<Option<Todo>, StoreError> {
        Ok(self.tables.lock().await.todos.get(&(owner, id)).cloned())
    }

    async fn fetch_todos(&self, owner: UserId) -> Result<Vec<Todo>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .todos
            .iter()
            .filter(|((todo_owner, _), _)| *todo_owner == owner)
            .map(|(_, todo)| todo.clone())
            .collect())
    }

    async fn update_todo(
        &self,
        owner: UserId,
        id: i64,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(todo) = tables.todos.get_mut(&(owner, id)) else {
            return Ok(None);
        };
        if let Some(task) = &patch.task {
            todo.task = task.clone();
        }
        if let Some(summary) = &patch.summary {
            todo.summary = summary.clone();
        }
        Ok(Some(todo.clone()))
    }

    async fn delete_todo(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.todos.remove(&(owner, id)).is_some())
    }
}
