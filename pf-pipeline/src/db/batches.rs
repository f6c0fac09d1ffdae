//! Batch persistence operations

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Batch, BatchStatus};
use pf_common::{Error, Result};

/// Insert a new batch
pub async fn insert_batch(pool: &SqlitePool, batch: &Batch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO batches (id, external_ref, status, callback_url, created_at, completed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(&batch.external_ref)
    .bind(batch.status.as_str())
    .bind(&batch.callback_url)
    .bind(batch.created_at.to_rfc3339())
    .bind(batch.completed_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a batch by id
pub async fn get_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Option<Batch>> {
    let row = sqlx::query(
        "SELECT id, external_ref, status, callback_url, created_at, completed_at FROM batches WHERE id = ?",
    )
    .bind(batch_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(parse_batch_row).transpose()
}

/// Load a batch by the caller-supplied correlation key
pub async fn get_batch_by_external_ref(
    pool: &SqlitePool,
    external_ref: &str,
) -> Result<Option<Batch>> {
    let row = sqlx::query(
        r#"
        SELECT id, external_ref, status, callback_url, created_at, completed_at
        FROM batches WHERE external_ref = ?
        ORDER BY created_at DESC LIMIT 1
        "#,
    )
    .bind(external_ref)
    .fetch_optional(pool)
    .await?;

    row.map(parse_batch_row).transpose()
}

/// Compare-and-set the batch Pending→Completed
///
/// Returns true only for the single caller that wins the transition; every
/// other concurrent caller sees false and must not fire the callback.
pub async fn try_complete_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE batches SET status = 'completed', completed_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(batch_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn parse_batch_row(row: sqlx::sqlite::SqliteRow) -> Result<Batch> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid batch id in database: {}", e)))?;

    let status: String = row.get("status");
    let status = BatchStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown batch status: {}", status)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse completed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    Ok(Batch {
        id,
        external_ref: row.get("external_ref"),
        status,
        callback_url: row.get("callback_url"),
        created_at,
        completed_at,
    })
}
