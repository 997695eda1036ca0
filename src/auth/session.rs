use std::{sync::Arc, time::Duration};

use base64::{engine::general_purpose, Engine};
use chrono::Utc;
use ring::{
    digest,
    rand::{SecureRandom, SystemRandom},
};

use super::Credentials;
use crate::{
    error::{AppError, StoreError},
    model::{Session, UserId},
    store::Store,
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "todo_session";

const SESSION_ID_BYTES: usize = 32;

/// Issues, resolves and revokes sessions. The client only ever sees the
/// random session id; the store keys sessions by its SHA-256 digest.
pub struct SessionAuthority {
    store: Arc<dyn Store>,
    credentials: Arc<Credentials>,
    rng: SystemRandom,
    ttl: Duration,
}

impl SessionAuthority {
    pub fn new(store: Arc<dyn Store>, credentials: Arc<Credentials>, ttl: Duration) -> Self {
        Self {
            store,
            credentials,
            rng: SystemRandom::new(),
            ttl,
        }
    }

    /// Verifies the credentials and opens a session for the user.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        let user_id = self.credentials.authenticate(username, password).await?;
        self.open_session(user_id).await
    }

    /// Revokes the session. Fails when it is not (or no longer) active.
    pub async fn logout(&self, session_id: &str) -> Result<(), AppError> {
        if self.store.delete_session(&digest_session_id(session_id)).await? {
            Ok(())
        } else {
            Err(AppError::Unauthenticated)
        }
    }

    /// Resolves a session id to its user. Expired sessions resolve to `None`
    /// and are dropped on the way.
    pub async fn current_user(&self, session_id: &str) -> Result<Option<UserId>, AppError> {
        let token_digest = digest_session_id(session_id);
        let Some(session) = self.store.find_session(&token_digest).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now().timestamp()) {
            self.store.delete_session(&token_digest).await?;
            return Ok(None);
        }
        Ok(Some(session.user_id))
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        Ok(self
            .store
            .purge_expired_sessions(Utc::now().timestamp())
            .await?)
    }

    async fn open_session(&self, user_id: UserId) -> Result<String, AppError> {
        let expires_at = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| Utc::now().timestamp().checked_add(ttl))
            .ok_or_else(|| AppError::Internal(format!("session ttl {:?} out of range", self.ttl)))?;

        loop {
            let session_id = self.generate_session_id()?;
            let session = Session {
                token_digest: digest_session_id(&session_id),
                user_id,
                expires_at,
            };
            match self.store.insert_session(&session).await {
                Ok(()) => return Ok(session_id),
                // Digest collision: draw another id.
                Err(StoreError::Duplicate) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn generate_session_id(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal("system random source failed".to_string()))?;
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }
}

fn digest_session_id(session_id: &str) -> String {
    let hash = digest::digest(&digest::SHA256, session_id.as_bytes());
    general_purpose::STANDARD.encode(hash.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::PasswordHasher,
        config::MIN_PASSWORD_COST,
        store::{self, MEMORY_BACKEND},
    };

    async fn authority(ttl: Duration) -> (SessionAuthority, Arc<dyn Store>) {
        let store = store::open(MEMORY_BACKEND).await.unwrap();
        let hasher = PasswordHasher::new(MIN_PASSWORD_COST).await.unwrap();
        let credentials = Arc::new(Credentials::new(store.clone(), hasher));
        credentials.register("alice", "pw1").await.unwrap();
        (
            SessionAuthority::new(store.clone(), credentials, ttl),
            store,
        )
    }

    #[tokio::test]
    async fn test_login_resolves_to_user() {
        let (sessions, store) = authority(Duration::from_secs(60)).await;
        let session_id = sessions.login("alice", "pw1").await.unwrap();
        let alice = store.find_user("alice").await.unwrap().unwrap();

        assert_eq!(
            sessions.current_user(&session_id).await.unwrap(),
            Some(alice.id)
        );
        // The raw id is never what gets stored.
        assert!(store.find_session(&session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_each_login_issues_a_fresh_id() {
        let (sessions, _) = authority(Duration::from_secs(60)).await;
        let first = sessions.login("alice", "pw1").await.unwrap();
        let second = sessions.login("alice", "pw1").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let (sessions, _) = authority(Duration::from_secs(60)).await;
        let wrong_password = sessions.login("alice", "nope").await.unwrap_err();
        let unknown_user = sessions.login("mallory", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_user, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let (sessions, _) = authority(Duration::from_secs(60)).await;
        let session_id = sessions.login("alice", "pw1").await.unwrap();

        sessions.logout(&session_id).await.unwrap();
        assert_eq!(sessions.current_user(&session_id).await.unwrap(), None);
        assert!(matches!(
            sessions.logout(&session_id).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let (sessions, _) = authority(Duration::ZERO).await;
        let session_id = sessions.login("alice", "pw1").await.unwrap();
        assert_eq!(sessions.current_user(&session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (sessions, _) = authority(Duration::ZERO).await;
        sessions.login("alice", "pw1").await.unwrap();
        sessions.login("alice", "pw1").await.unwrap();
        assert_eq!(sessions.purge_expired().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_fails_instead_of_wrapping() {
        let (sessions, store) = authority(Duration::from_secs(u64::MAX)).await;
        assert!(matches!(
            sessions.login("alice", "pw1").await,
            Err(AppError::Internal(_))
        ));
        let (sessions, _) = authority(Duration::from_secs(i64::MAX as u64)).await;
        assert!(matches!(
            sessions.login("alice", "pw1").await,
            Err(AppError::Internal(_))
        ));
        assert_eq!(store.purge_expired_sessions(i64::MAX).await.unwrap(), 0);
    }

    #[test]
    fn test_session_digest_is_deterministic() {
        assert_ne!(digest_session_id("a"), digest_session_id("b"));
        assert_eq!(digest_session_id("a"), digest_session_id("a"));
    }
}
