//! Machine catalog persistence

use super::{Database, StorageError};
use crate::types::{Machine, Parameter};

fn decode_machine(id: i64, name: String, params: &str) -> Result<Machine, StorageError> {
    let parameters: Vec<Parameter> = serde_json::from_str(params)
        .map_err(|e| StorageError::Corrupt(format!("machine {id} params: {e}")))?;
    Ok(Machine { id, name, parameters })
}

/// Insert a machine with its ordered parameter list.
pub async fn insert_machine(
    db: &Database,
    name: &str,
    parameters: &[Parameter],
) -> Result<i64, StorageError> {
    let params = serde_json::to_string(parameters)?;
    let result = sqlx::query("INSERT INTO machines (name, params) VALUES (?, ?)")
        .bind(name)
        .bind(params)
        .execute(db.pool())
        .await?;
    Ok(result.last_insert_rowid())
}

/// All machines in catalog order.
pub async fn list_machines(db: &Database) -> Result<Vec<Machine>, StorageError> {
    let rows: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, name, params FROM machines ORDER BY id")
            .fetch_all(db.pool())
            .await?;

    rows.into_iter()
        .map(|(id, name, params)| decode_machine(id, name, &params))
        .collect()
}

pub async fn get_machine(db: &Database, id: i64) -> Result<Machine, StorageError> {
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, name, params FROM machines WHERE id = ?")
            .bind(id)
            .fetch_optional(db.pool())
            .await?;

    match row {
        Some((id, name, params)) => decode_machine(id, name, &params),
        None => Err(StorageError::NotFound { entity: "machine", id }),
    }
}
