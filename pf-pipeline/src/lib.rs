//! pf-pipeline library interface
//!
//! Contact-discovery batch pipeline: a durable, rate-limited work queue
//! drives a multi-provider waterfall over three third-party data sources,
//! with an idempotent call ledger for dedup, batch-level pause backpressure
//! on credit exhaustion, and a webhook receiver for providers that answer
//! asynchronously.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pause;
pub mod processor;
pub mod providers;
pub mod submit;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use processor::BatchProcessor;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Shared processor (waterfall, webhook continuation, completion check)
    pub processor: Arc<BatchProcessor>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, processor: Arc<BatchProcessor>) -> Self {
        Self {
            db,
            processor,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::batch_routes())
        .merge(api::webhook_routes())
        .merge(api::health_routes())
        .with_state(state)
}
