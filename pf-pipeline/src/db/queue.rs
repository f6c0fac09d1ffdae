//! Durable FIFO job queue, one row per queued task job
//!
//! `seq` is the queue order. Re-queuing deletes the row and inserts a new
//! one, which lands it at the tail; there is no backoff, only FIFO order.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use pf_common::{Error, Result};

/// One queued job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub seq: i64,
    pub task_id: Uuid,
    pub batch_id: Uuid,
    /// Transient-failure count; pause re-queues do not increment this
    pub attempts: i64,
}

/// Append a fresh job to the tail
pub async fn enqueue(pool: &SqlitePool, task_id: Uuid, batch_id: Uuid) -> Result<i64> {
    enqueue_with_attempts(pool, task_id, batch_id, 0).await
}

async fn enqueue_with_attempts(
    pool: &SqlitePool,
    task_id: Uuid,
    batch_id: Uuid,
    attempts: i64,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO job_queue (task_id, batch_id, attempts) VALUES (?, ?, ?)")
        .bind(task_id.to_string())
        .bind(batch_id.to_string())
        .bind(attempts)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Move a job to the tail, optionally counting a transient failure
pub async fn requeue_tail(pool: &SqlitePool, job: &QueuedJob, bump_attempts: bool) -> Result<i64> {
    remove(pool, job.seq).await?;
    let attempts = if bump_attempts { job.attempts + 1 } else { job.attempts };
    enqueue_with_attempts(pool, job.task_id, job.batch_id, attempts).await
}

/// Head of the queue, if any
pub async fn next_job(pool: &SqlitePool) -> Result<Option<QueuedJob>> {
    let row = sqlx::query("SELECT seq, task_id, batch_id, attempts FROM job_queue ORDER BY seq LIMIT 1")
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        let task_id: String = row.get("task_id");
        let task_id = Uuid::parse_str(&task_id)
            .map_err(|e| Error::Internal(format!("Invalid task id in queue: {}", e)))?;
        let batch_id: String = row.get("batch_id");
        let batch_id = Uuid::parse_str(&batch_id)
            .map_err(|e| Error::Internal(format!("Invalid batch id in queue: {}", e)))?;

        Ok(QueuedJob {
            seq: row.get("seq"),
            task_id,
            batch_id,
            attempts: row.get("attempts"),
        })
    })
    .transpose()
}

/// Remove a job (normal completion path)
pub async fn remove(pool: &SqlitePool, seq: i64) -> Result<()> {
    sqlx::query("DELETE FROM job_queue WHERE seq = ?")
        .bind(seq)
        .execute(pool)
        .await?;
    Ok(())
}

/// Current queue depth
pub async fn depth(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_queue")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
