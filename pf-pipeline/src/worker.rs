//! Queue worker: single consumer draining the durable job queue
//!
//! Concurrency is deliberately 1, serializing provider calls; pacing is a
//! queue-level rolling-minute rate limiter, not per-adapter throttling.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::db;
use crate::processor::BatchProcessor;

/// Poll interval when the queue is empty
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pause between iterations after an infrastructure error
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Run the worker loop forever
///
/// The rate limiter gates every job pickup, including pause re-queues, so a
/// fully paused batch cannot spin the loop hot. Infrastructure failures are
/// recorded into `last_error` for the health endpoint.
pub async fn run_worker(
    processor: Arc<BatchProcessor>,
    jobs_per_minute: u32,
    last_error: Arc<RwLock<Option<String>>>,
) {
    let quota = Quota::per_minute(NonZeroU32::new(jobs_per_minute.max(1)).expect("non-zero"));
    let limiter = RateLimiter::direct(quota);

    tracing::info!(jobs_per_minute, "Queue worker started");

    loop {
        match db::queue::next_job(processor.pool()).await {
            Ok(Some(job)) => {
                limiter.until_ready().await;
                debug!(task_id = %job.task_id, seq = job.seq, "Processing job");
                if let Err(e) = processor.process_job(&job).await {
                    // Infrastructure failure mid-job; push the job to the
                    // tail so one broken row cannot wedge the queue head
                    warn!(task_id = %job.task_id, error = %e, "Job processing failed");
                    *last_error.write().await = Some(format!("Job processing failed: {}", e));
                    if let Err(e) = db::queue::requeue_tail(processor.pool(), &job, true).await {
                        warn!(seq = job.seq, error = %e, "Failed to re-queue job");
                    }
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
            Ok(None) => {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read job queue");
                *last_error.write().await = Some(format!("Failed to read job queue: {}", e));
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
}
