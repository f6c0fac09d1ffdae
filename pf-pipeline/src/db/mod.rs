//! Database access for the pipeline service
//!
//! SQLite via sqlx; tables are created idempotently at startup.

pub mod batches;
pub mod ledger;
pub mod queue;
pub mod tasks;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests
///
/// Pinned to a single connection: each `:memory:` connection is its own
/// database, so a larger pool would scatter the tables.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create pipeline tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            id TEXT PRIMARY KEY,
            external_ref TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            callback_url TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL,
            identity TEXT NOT NULL,
            want_email INTEGER NOT NULL DEFAULT 0,
            want_phone INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            emails TEXT NOT NULL DEFAULT '[]',
            phones TEXT NOT NULL DEFAULT '[]',
            call_ledger_ids TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_batch ON tasks(batch_id)")
        .execute(pool)
        .await?;

    // Dedup index: one entry per (provider, mode, subject, normalized domain).
    // LinkedIn-mode entries store an empty company_domain so a later
    // domain-mode lookup for the same subject can find them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider TEXT NOT NULL,
            search_mode TEXT NOT NULL,
            user_id TEXT NOT NULL,
            user_source TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            company_domain TEXT NOT NULL DEFAULT '',
            linkedin_handle TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'pending',
            result_payload TEXT,
            emails TEXT NOT NULL DEFAULT '[]',
            phones TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(provider, search_mode, user_id, user_source, company_domain)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Durable FIFO: seq ordering is the queue order; re-queue = delete + insert
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_queue (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id TEXT NOT NULL,
            batch_id TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS paused_batches (
            batch_id TEXT PRIMARY KEY,
            paused_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (batches, tasks, call_ledger, job_queue, paused_batches)");

    Ok(())
}
