//! Pause registry: batch-level backpressure for credit exhaustion
//!
//! A shared set of paused batch ids, consulted by the worker before any
//! provider call. The pipeline only ever adds entries; removal is an
//! explicit administrative resume, so an exhausted provider account is never
//! hammered by automatic retries.
//!
//! Held as an injected handle, not ambient global state.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use pf_common::Result;

/// Handle over the shared paused-batches set
#[derive(Clone)]
pub struct PauseRegistry {
    pool: SqlitePool,
}

impl PauseRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomic add; pausing an already-paused batch is a no-op
    pub async fn pause(&self, batch_id: Uuid) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO paused_batches (batch_id, paused_at) VALUES (?, ?)")
            .bind(batch_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::warn!(batch_id = %batch_id, "Batch paused (provider credits exhausted)");
        Ok(())
    }

    pub async fn is_paused(&self, batch_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paused_batches WHERE batch_id = ?")
            .bind(batch_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Administrative resume; returns true when an entry was actually cleared
    pub async fn resume(&self, batch_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM paused_batches WHERE batch_id = ?")
            .bind(batch_id.to_string())
            .execute(&self.pool)
            .await?;

        let cleared = result.rows_affected() > 0;
        if cleared {
            tracing::info!(batch_id = %batch_id, "Batch resumed");
        }
        Ok(cleared)
    }
}
