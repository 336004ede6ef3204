//! Inspection and reaction persistence
//!
//! Measurements are stored as an opaque JSON array next to the computed
//! status. Nothing queries individual measurement values.

use chrono::NaiveDate;

use super::{classify_write_error, Database, StorageError};
use crate::types::{Inspection, InspectionStatus, Measurement, NewInspection, Reaction, Shift};

const DATE_FORMAT: &str = "%Y-%m-%d";

type InspectionRow = (i64, i64, i64, String, String, String, String);

fn decode_inspection(row: InspectionRow) -> Result<Inspection, StorageError> {
    let (id, user_id, machine_id, shift, date, measurements, status) = row;

    let shift: Shift = shift
        .parse()
        .map_err(|e| StorageError::Corrupt(format!("inspection {id} shift: {e}")))?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| StorageError::Corrupt(format!("inspection {id} date: {e}")))?;
    let measurements: Vec<Measurement> = serde_json::from_str(&measurements)
        .map_err(|e| StorageError::Corrupt(format!("inspection {id} measurements: {e}")))?;
    let status: InspectionStatus = status
        .parse()
        .map_err(|e| StorageError::Corrupt(format!("inspection {id} status: {e}")))?;

    Ok(Inspection {
        id,
        user_id,
        machine_id,
        shift,
        date,
        measurements,
        status,
    })
}

/// Persist an inspection and return its id.
pub async fn save_inspection(db: &Database, new: &NewInspection) -> Result<i64, StorageError> {
    let measurements = serde_json::to_string(&new.measurements)?;
    let result = sqlx::query(
        "INSERT INTO inspections (user_id, machine_id, shift, date, measurements, status) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(new.user_id)
    .bind(new.machine_id)
    .bind(new.shift.as_str())
    .bind(new.date.format(DATE_FORMAT).to_string())
    .bind(measurements)
    .bind(new.status.as_str())
    .execute(db.pool())
    .await
    .map_err(classify_write_error)?;

    let id = result.last_insert_rowid();
    tracing::info!(
        inspection_id = id,
        machine_id = new.machine_id,
        status = %new.status,
        "Inspection saved"
    );
    Ok(id)
}

pub async fn get_inspection(db: &Database, id: i64) -> Result<Inspection, StorageError> {
    let row: Option<InspectionRow> = sqlx::query_as(
        "SELECT id, user_id, machine_id, shift, date, measurements, status \
         FROM inspections WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db.pool())
    .await?;

    row.map_or(
        Err(StorageError::NotFound { entity: "inspection", id }),
        decode_inspection,
    )
}

/// Newest first.
pub async fn list_inspections_for_user(
    db: &Database,
    user_id: i64,
    limit: u32,
) -> Result<Vec<Inspection>, StorageError> {
    let rows: Vec<InspectionRow> = sqlx::query_as(
        "SELECT id, user_id, machine_id, shift, date, measurements, status \
         FROM inspections WHERE user_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(i64::from(limit))
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(decode_inspection).collect()
}

/// Attach a reaction to an inspection. A second reaction for the same
/// inspection is a `UniqueViolation`.
pub async fn save_reaction(
    db: &Database,
    inspection_id: i64,
    text: &str,
) -> Result<i64, StorageError> {
    let result = sqlx::query("INSERT INTO reactions (inspection_id, reaction) VALUES (?, ?)")
        .bind(inspection_id)
        .bind(text)
        .execute(db.pool())
        .await
        .map_err(classify_write_error)?;
    tracing::info!(inspection_id, "Reaction saved");
    Ok(result.last_insert_rowid())
}

pub async fn get_reaction(
    db: &Database,
    inspection_id: i64,
) -> Result<Option<Reaction>, StorageError> {
    let row: Option<(i64, i64, String)> = sqlx::query_as(
        "SELECT id, inspection_id, reaction FROM reactions WHERE inspection_id = ?",
    )
    .bind(inspection_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|(id, inspection_id, text)| Reaction {
        id,
        inspection_id,
        text,
    }))
}
