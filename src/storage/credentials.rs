//! User credential rows
//!
//! Only hashes are stored; hashing and verification live in `crate::auth`.

use super::{classify_write_error, Database, StorageError};

/// A stored credential.
#[derive(Debug, Clone)]
pub struct CredentialRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// Insert a user. A taken username yields `StorageError::UniqueViolation`.
pub async fn insert_user(
    db: &Database,
    username: &str,
    password_hash: &str,
) -> Result<i64, StorageError> {
    let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(db.pool())
        .await
        .map_err(classify_write_error)?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_username(
    db: &Database,
    username: &str,
) -> Result<Option<CredentialRow>, StorageError> {
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(db.pool())
            .await?;

    Ok(row.map(|(id, username, password_hash)| CredentialRow {
        id,
        username,
        password_hash,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();

        let id = insert_user(&db, "alice", "hash-1").await.unwrap();
        let err = insert_user(&db, "alice", "hash-2").await.unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation(_)), "{err:?}");

        let row = find_by_username(&db, "alice").await.unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.password_hash, "hash-1");
        assert!(find_by_username(&db, "bob").await.unwrap().is_none());
    }
}
