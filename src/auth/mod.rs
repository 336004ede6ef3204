//! Username/password authentication
//!
//! Passwords are bcrypt-hashed before they reach storage. Hashing and
//! verification are CPU-bound and run on the blocking pool.

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::storage::{credentials, Database, StorageError};

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username already exists")]
    AlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username and password must not be empty")]
    EmptyInput,
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation(_) => Self::AlreadyExists,
            other => Self::Storage(other),
        }
    }
}

/// Registers and authenticates users against the `users` table.
#[derive(Debug)]
pub struct CredentialStore {
    db: Database,
    cost: u32,
    /// Hash verified for unknown usernames so both failure paths cost the same.
    dummy_hash: OnceCell<String>,
}

impl CredentialStore {
    pub fn new(db: Database, cost: u32) -> Self {
        Self {
            db,
            cost,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Create a user and return its id.
    pub async fn register(&self, username: &str, password: &str) -> Result<i64, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::EmptyInput);
        }

        let hash = hash_blocking(password.to_string(), self.cost).await?;
        let id = credentials::insert_user(&self.db, username, &hash).await?;
        info!(user_id = id, username, "User registered");
        Ok(id)
    }

    /// Return the user id when `password` matches the stored hash.
    ///
    /// Unknown username and wrong password both yield `InvalidCredentials`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<i64, AuthError> {
        let username = username.trim();
        let row = credentials::find_by_username(&self.db, username).await?;

        let (id, hash) = match row {
            Some(row) => (Some(row.id), row.password_hash),
            None => (None, self.dummy_hash().await?.to_string()),
        };

        let matches = verify_blocking(password.to_string(), hash).await?;
        match id {
            Some(id) if matches => {
                debug!(user_id = id, "Authenticated");
                Ok(id)
            }
            _ => {
                debug!(username, "Authentication rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn dummy_hash(&self) -> Result<&str, AuthError> {
        let cost = self.cost;
        let hash = self
            .dummy_hash
            .get_or_try_init(|| hash_blocking("machinery-qa-dummy".to_string(), cost))
            .await?;
        Ok(hash.as_str())
    }
}

async fn hash_blocking(password: String, cost: u32) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> CredentialStore {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();
        CredentialStore::new(db, 4)
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first_user() {
        let store = store().await;
        let id = store.register("alice", "s3cret").await.unwrap();

        let err = store.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));
        assert_eq!(err.to_string(), "Username already exists");

        assert_eq!(store.authenticate("alice", "s3cret").await.unwrap(), id);
        assert!(store.authenticate("alice", "other").await.is_err());
    }

    #[tokio::test]
    async fn test_correct_pair_returns_matching_id() {
        let store = store().await;
        let alice = store.register("alice", "a-pass").await.unwrap();
        let bob = store.register("bob", "b-pass").await.unwrap();

        assert_eq!(store.authenticate("alice", "a-pass").await.unwrap(), alice);
        assert_eq!(store.authenticate("bob", "b-pass").await.unwrap(), bob);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let store = store().await;
        store.register("alice", "a-pass").await.unwrap();

        let wrong = store.authenticate("alice", "nope").await.unwrap_err();
        let unknown = store.authenticate("mallory", "a-pass").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_username_is_trimmed_and_blank_rejected() {
        let store = store().await;
        let id = store.register("  carol ", "pw").await.unwrap();
        assert_eq!(store.authenticate("carol", "pw").await.unwrap(), id);

        assert!(matches!(store.register("   ", "pw").await, Err(AuthError::EmptyInput)));
        assert!(matches!(store.register("dave", "").await, Err(AuthError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_clear() {
        let store = store().await;
        store.register("erin", "plain-text").await.unwrap();
        let row = credentials::find_by_username(&store.db, "erin").await.unwrap().unwrap();
        assert_ne!(row.password_hash, "plain-text");
        assert!(row.password_hash.starts_with("$2"));
    }
}
