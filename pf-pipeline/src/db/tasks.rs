//! Task persistence operations
//!
//! The worker and the webhook receiver can write the same task concurrently:
//! a provider may deliver its webhook while the worker is still persisting
//! that task's partial progress. Result merges therefore run inside an
//! immediate transaction, and merge by appending, so concurrent and repeated
//! writes are safe and idempotent.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Identity, Task, TaskStatus};
use pf_common::{Error, Result};

/// Insert a new task
pub async fn insert_task(pool: &SqlitePool, task: &Task) -> Result<()> {
    let identity = serde_json::to_string(&task.identity)
        .map_err(|e| Error::Internal(format!("Failed to serialize identity: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO tasks (id, batch_id, identity, want_email, want_phone, status, emails, phones, call_ledger_ids)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(task.id.to_string())
    .bind(task.batch_id.to_string())
    .bind(identity)
    .bind(task.want_email as i64)
    .bind(task.want_phone as i64)
    .bind(task.status.as_str())
    .bind(to_json(&task.emails)?)
    .bind(to_json(&task.phones)?)
    .bind(to_json(&task.call_ledger_ids)?)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a task by id
pub async fn get_task(pool: &SqlitePool, task_id: Uuid) -> Result<Option<Task>> {
    let row = sqlx::query(
        r#"
        SELECT id, batch_id, identity, want_email, want_phone, status, emails, phones, call_ledger_ids
        FROM tasks WHERE id = ?
        "#,
    )
    .bind(task_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(parse_task_row).transpose()
}

/// All tasks of a batch, in insertion (rowid) order
pub async fn list_tasks_for_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        r#"
        SELECT id, batch_id, identity, want_email, want_phone, status, emails, phones, call_ledger_ids
        FROM tasks WHERE batch_id = ? ORDER BY rowid
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(parse_task_row).collect()
}

/// Set a task's status only
pub async fn set_task_status(pool: &SqlitePool, task_id: Uuid, status: TaskStatus) -> Result<()> {
    sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(task_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Merge new results into a task without changing its status
///
/// Appends emails/phones/ledger ids that are not already present; used to
/// persist partial progress before handing a task to the webhook path.
pub async fn merge_task_results(
    pool: &SqlitePool,
    task_id: Uuid,
    emails: &[String],
    phones: &[String],
    ledger_ids: &[i64],
) -> Result<()> {
    merge_in_transaction(pool, task_id, emails, phones, ledger_ids, None).await
}

/// Merge results and mark the task terminal in one step
pub async fn finalize_task(
    pool: &SqlitePool,
    task_id: Uuid,
    status: TaskStatus,
    emails: &[String],
    phones: &[String],
    ledger_ids: &[i64],
) -> Result<()> {
    merge_in_transaction(pool, task_id, emails, phones, ledger_ids, Some(status)).await
}

/// Read-modify-write merge under an immediate transaction
///
/// The write lock is taken before the SELECT, so two concurrent merges for
/// the same task serialize instead of overwriting each other's appends.
async fn merge_in_transaction(
    pool: &SqlitePool,
    task_id: Uuid,
    emails: &[String],
    phones: &[String],
    ledger_ids: &[i64],
    status: Option<TaskStatus>,
) -> Result<()> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    let merged = async {
        let row = sqlx::query("SELECT emails, phones, call_ledger_ids FROM tasks WHERE id = ?")
            .bind(task_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Err(Error::NotFound(format!("Task not found: {}", task_id)));
        };

        let mut merged_emails: Vec<String> = from_json(row.get("emails"))?;
        let mut merged_phones: Vec<String> = from_json(row.get("phones"))?;
        let mut merged_ids: Vec<i64> = from_json(row.get("call_ledger_ids"))?;
        append_missing(&mut merged_emails, emails);
        append_missing(&mut merged_phones, phones);
        append_missing(&mut merged_ids, ledger_ids);

        match status {
            Some(status) => {
                sqlx::query(
                    "UPDATE tasks SET emails = ?, phones = ?, call_ledger_ids = ?, status = ? WHERE id = ?",
                )
                .bind(to_json(&merged_emails)?)
                .bind(to_json(&merged_phones)?)
                .bind(to_json(&merged_ids)?)
                .bind(status.as_str())
                .bind(task_id.to_string())
                .execute(&mut *conn)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE tasks SET emails = ?, phones = ?, call_ledger_ids = ? WHERE id = ?",
                )
                .bind(to_json(&merged_emails)?)
                .bind(to_json(&merged_phones)?)
                .bind(to_json(&merged_ids)?)
                .bind(task_id.to_string())
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }
    .await;

    match merged {
        Ok(()) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(())
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}

/// Number of tasks in the batch that are not yet terminal
pub async fn count_non_terminal(pool: &SqlitePool, batch_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE batch_id = ? AND status NOT IN ('completed', 'failed')",
    )
    .bind(batch_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Per-status task counts for a batch, for status derivation
pub async fn count_by_status(pool: &SqlitePool, batch_id: Uuid) -> Result<(i64, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE batch_id = ?")
        .bind(batch_id.to_string())
        .fetch_one(pool)
        .await?;

    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE batch_id = ? AND status = 'pending'")
            .bind(batch_id.to_string())
            .fetch_one(pool)
            .await?;

    Ok((total, pending))
}

fn append_missing<T: PartialEq + Clone>(target: &mut Vec<T>, additions: &[T]) {
    for item in additions {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("Serialization failed: {}", e)))
}

fn parse_task_row(row: sqlx::sqlite::SqliteRow) -> Result<Task> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid task id in database: {}", e)))?;

    let batch_id: String = row.get("batch_id");
    let batch_id = Uuid::parse_str(&batch_id)
        .map_err(|e| Error::Internal(format!("Invalid batch id in database: {}", e)))?;

    let identity: String = row.get("identity");
    let identity: Identity = serde_json::from_str(&identity)
        .map_err(|e| Error::Internal(format!("Failed to deserialize identity: {}", e)))?;

    let status: String = row.get("status");
    let status = TaskStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown task status: {}", status)))?;

    Ok(Task {
        id,
        batch_id,
        identity,
        want_email: row.get::<i64, _>("want_email") != 0,
        want_phone: row.get::<i64, _>("want_phone") != 0,
        status,
        emails: from_json(row.get("emails"))?,
        phones: from_json(row.get("phones"))?,
        call_ledger_ids: from_json(row.get("call_ledger_ids"))?,
    })
}

fn from_json<T: serde::de::DeserializeOwned>(raw: String) -> Result<T> {
    serde_json::from_str(&raw).map_err(|e| Error::Internal(format!("Deserialization failed: {}", e)))
}
