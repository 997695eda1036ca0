//! Salted bcrypt digests. The work runs on the blocking pool so a login burst
//! does not stall the async workers.

use tokio::task;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    // Verified against when a username is unknown, so both login failures
    // cost the same amount of work.
    dummy_digest: String,
}

impl PasswordHasher {
    pub async fn new(cost: u32) -> Result<Self, AppError> {
        let dummy_digest = hash_blocking("not-a-real-password".to_string(), cost).await?;
        Ok(Self { cost, dummy_digest })
    }

    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        hash_blocking(password.to_string(), self.cost).await
    }

    /// Checks `password` against `digest`. A missing digest still performs a
    /// full verification and then reports a mismatch.
    pub async fn verify(&self, password: &str, digest: Option<&str>) -> Result<bool, AppError> {
        let known = digest.is_some();
        let digest = digest.unwrap_or(&self.dummy_digest).to_string();
        let password = password.to_string();

        let matches = task::spawn_blocking(move || bcrypt::verify(password, &digest))
            .await
            .map_err(|e| AppError::Internal(format!("password task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("stored digest is unusable: {e}")))?;

        Ok(known && matches)
    }
}

async fn hash_blocking(password: String, cost: u32) -> Result<String, AppError> {
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_PASSWORD_COST;

    #[tokio::test]
    async fn test_hash_is_salted_and_verifies() {
        let hasher = PasswordHasher::new(MIN_PASSWORD_COST).await.unwrap();
        let first = hasher.hash("pw1").await.unwrap();
        let second = hasher.hash("pw1").await.unwrap();

        assert_ne!(first, "pw1");
        assert_ne!(first, second);
        assert!(hasher.verify("pw1", Some(&first)).await.unwrap());
        assert!(hasher.verify("pw1", Some(&second)).await.unwrap());
        assert!(!hasher.verify("pw2", Some(&first)).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_digest_never_matches() {
        let hasher = PasswordHasher::new(MIN_PASSWORD_COST).await.unwrap();
        assert!(!hasher.verify("not-a-real-password", None).await.unwrap());
    }
}
