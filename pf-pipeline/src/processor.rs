//! Batch processor: waterfall resolution, task finalization, and the
//! exactly-once batch completion transition
//!
//! One processor instance is shared by the queue worker and the webhook
//! receiver. The worker is the only queue consumer (concurrency 1); the
//! webhook path runs on ordinary HTTP concurrency and may finalize tasks
//! concurrently with it, so the completion check is guarded by a
//! compare-and-set on the batch status.

use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;
use crate::db::queue::QueuedJob;
use crate::models::{
    Batch, BatchExport, Identity, LedgerStatus, Provider, SearchMode, SubjectContacts, Task,
    TaskStatus,
};
use crate::pause::PauseRegistry;
use crate::providers::{FindOpts, ProviderSet};
use pf_common::Result;

/// How a queue job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Task reached a terminal state; completion check ran
    Finalized,
    /// Primary email provider answers via webhook; task left Processing
    AwaitingWebhook,
    /// Job moved to the queue tail (pause or transient failure)
    Requeued,
    /// Job referenced a missing or already-terminal task
    Skipped,
}

/// How a webhook delivery ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Task finalized; completion check ran
    Finalized,
    /// Duplicate delivery for an already-finalized task; no-op
    Ignored,
    /// Fallback hit credit exhaustion; batch paused, task re-enqueued
    Requeued,
}

/// Results gathered while walking the waterfall for one task
#[derive(Debug, Default)]
struct Gathered {
    emails: Vec<String>,
    phones: Vec<String>,
    ledger_ids: Vec<i64>,
    awaiting_webhook: bool,
}

impl Gathered {
    fn absorb(&mut self, step: &StepResult) {
        self.ledger_ids.push(step.ledger_id);
        for email in &step.emails {
            if !self.emails.contains(email) {
                self.emails.push(email.clone());
            }
        }
        for phone in &step.phones {
            if !self.phones.contains(phone) {
                self.phones.push(phone.clone());
            }
        }
    }
}

/// One ledger-mediated provider step
#[derive(Debug)]
struct StepResult {
    ledger_id: i64,
    emails: Vec<String>,
    phones: Vec<String>,
    still_searching: bool,
}

/// Internal waterfall error taxonomy
#[derive(Debug)]
enum WaterfallError {
    /// Provider account exhausted; escalates to a batch pause
    NoCredits,
    /// Timeout / transport / malformed response; job is re-queued
    Transient(String),
    /// Infrastructure failure; propagated to the caller
    Db(pf_common::Error),
}

impl From<pf_common::Error> for WaterfallError {
    fn from(e: pf_common::Error) -> Self {
        WaterfallError::Db(e)
    }
}

/// Webhook payload shape shared by async-capable providers
#[derive(Debug, serde::Deserialize)]
struct WebhookPayload {
    /// "completed", "searching", or "failed"
    #[serde(default)]
    status: String,
    #[serde(default)]
    emails: Vec<String>,
}

pub struct BatchProcessor {
    pool: SqlitePool,
    providers: ProviderSet,
    pause: PauseRegistry,
    /// Base for provider webhook callback URLs
    public_base_url: String,
    /// Transient re-queue cap before a task is marked failed
    max_attempts: u32,
    /// Client for aggregate callback delivery
    http_client: reqwest::Client,
}

impl BatchProcessor {
    pub fn new(
        pool: SqlitePool,
        providers: ProviderSet,
        pause: PauseRegistry,
        public_base_url: String,
        max_attempts: u32,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            pool,
            providers,
            pause,
            public_base_url,
            max_attempts,
            http_client,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn pause_registry(&self) -> &PauseRegistry {
        &self.pause
    }

    /// Process one queue job end to end
    pub async fn process_job(&self, job: &QueuedJob) -> Result<JobOutcome> {
        // Paused batches are re-queued untouched; attempts are not counted
        if self.pause.is_paused(job.batch_id).await? {
            debug!(batch_id = %job.batch_id, task_id = %job.task_id, "Batch paused, re-queuing job");
            db::queue::requeue_tail(&self.pool, job, false).await?;
            return Ok(JobOutcome::Requeued);
        }

        let Some(task) = db::tasks::get_task(&self.pool, job.task_id).await? else {
            warn!(task_id = %job.task_id, "Queued job references missing task, dropping");
            db::queue::remove(&self.pool, job.seq).await?;
            return Ok(JobOutcome::Skipped);
        };

        if task.status.is_terminal() {
            db::queue::remove(&self.pool, job.seq).await?;
            return Ok(JobOutcome::Skipped);
        }

        db::tasks::set_task_status(&self.pool, task.id, TaskStatus::Processing).await?;

        let mut gathered = Gathered::default();
        match self.run_waterfall(&task, &mut gathered).await {
            Ok(()) => {
                db::queue::remove(&self.pool, job.seq).await?;

                if gathered.awaiting_webhook {
                    // Persist partial progress; the webhook receiver finishes
                    // the chain and the Completed transition later
                    db::tasks::merge_task_results(
                        &self.pool,
                        task.id,
                        &gathered.emails,
                        &gathered.phones,
                        &gathered.ledger_ids,
                    )
                    .await?;
                    debug!(task_id = %task.id, "Task awaiting provider webhook");
                    return Ok(JobOutcome::AwaitingWebhook);
                }

                db::tasks::finalize_task(
                    &self.pool,
                    task.id,
                    TaskStatus::Completed,
                    &gathered.emails,
                    &gathered.phones,
                    &gathered.ledger_ids,
                )
                .await?;
                info!(
                    task_id = %task.id,
                    emails = gathered.emails.len(),
                    phones = gathered.phones.len(),
                    "Task completed"
                );
                self.check_and_complete_batch(task.batch_id).await?;
                Ok(JobOutcome::Finalized)
            }
            Err(WaterfallError::NoCredits) => {
                // Keep whatever the earlier steps produced, pause the whole
                // batch, and park the job at the tail for an external resume
                db::tasks::merge_task_results(
                    &self.pool,
                    task.id,
                    &gathered.emails,
                    &gathered.phones,
                    &gathered.ledger_ids,
                )
                .await?;
                self.pause.pause(task.batch_id).await?;
                db::queue::requeue_tail(&self.pool, job, false).await?;
                Ok(JobOutcome::Requeued)
            }
            Err(WaterfallError::Transient(msg)) => {
                db::tasks::merge_task_results(
                    &self.pool,
                    task.id,
                    &gathered.emails,
                    &gathered.phones,
                    &gathered.ledger_ids,
                )
                .await?;

                if job.attempts + 1 >= self.max_attempts as i64 {
                    warn!(
                        task_id = %task.id,
                        attempts = job.attempts + 1,
                        error = %msg,
                        "Transient retry cap reached, marking task failed"
                    );
                    db::queue::remove(&self.pool, job.seq).await?;
                    db::tasks::set_task_status(&self.pool, task.id, TaskStatus::Failed).await?;
                    self.check_and_complete_batch(task.batch_id).await?;
                    return Ok(JobOutcome::Finalized);
                }

                warn!(task_id = %task.id, error = %msg, "Transient failure, re-queuing job");
                db::queue::requeue_tail(&self.pool, job, true).await?;
                Ok(JobOutcome::Requeued)
            }
            Err(WaterfallError::Db(e)) => Err(e),
        }
    }

    /// The waterfall: phone resolution, then email resolution
    async fn run_waterfall(&self, task: &Task, gathered: &mut Gathered) -> std::result::Result<(), WaterfallError> {
        if task.want_phone {
            self.resolve_phone(task, gathered).await?;
        }

        // Email may already be satisfied by the phone step's side effect
        if task.want_email && gathered.emails.is_empty() {
            self.resolve_email(task, gathered).await?;
        }

        Ok(())
    }

    /// Phone resolution against the data-lake provider
    async fn resolve_phone(&self, task: &Task, gathered: &mut Gathered) -> std::result::Result<(), WaterfallError> {
        let identity = &task.identity;

        // LinkedIn handle wins; domain is the fallback; neither means skip
        // (a missing capability input is not a failure)
        let mode = if identity.has_linkedin() {
            SearchMode::LinkedIn
        } else if identity.has_domain() {
            SearchMode::Domain
        } else {
            debug!(task_id = %task.id, "No phone search input, skipping capability");
            return Ok(());
        };

        // Supersession: a completed LinkedIn-mode entry with phones
        // pre-empts a broader domain-mode call for the same subject.
        // Deliberately asymmetric: email has no such rule.
        if mode == SearchMode::Domain {
            if let Some(hit) =
                db::ledger::find_linkedin_phone_hit(&self.pool, Provider::DataLake, identity).await?
            {
                debug!(task_id = %task.id, ledger_id = hit.id, "Reusing LinkedIn-mode phone result");
                gathered.absorb(&StepResult {
                    ledger_id: hit.id,
                    emails: hit.emails,
                    phones: hit.phones,
                    still_searching: false,
                });
                return Ok(());
            }
        }

        let step = self
            .reuse_or_call(
                Provider::DataLake,
                mode,
                identity,
                task.want_email,
                true,
                None,
            )
            .await?;
        gathered.absorb(&step);
        Ok(())
    }

    /// Email resolution: ordered fallback chain with early exit
    async fn resolve_email(&self, task: &Task, gathered: &mut Gathered) -> std::result::Result<(), WaterfallError> {
        let identity = &task.identity;

        // (predicate, provider, mode) rules, evaluated in order. The primary
        // is async-capable and gets a webhook URL; the secondary only runs
        // when the primary definitively answered with no email.
        let rules: [(fn(&Identity) -> bool, Provider, SearchMode); 2] = [
            (Identity::has_domain, Provider::DomainEmail, SearchMode::Domain),
            (Identity::has_linkedin, Provider::ProfileEmail, SearchMode::LinkedIn),
        ];

        for (applies, provider, mode) in rules {
            if !applies(identity) {
                continue;
            }

            let webhook_task = (provider == Provider::DomainEmail).then_some(task.id);
            let step = self
                .reuse_or_call(provider, mode, identity, true, false, webhook_task)
                .await?;
            let found = !step.emails.is_empty();
            let still_searching = step.still_searching;
            gathered.absorb(&step);

            if still_searching {
                // The webhook receiver owns the rest of the chain
                gathered.awaiting_webhook = true;
                return Ok(());
            }
            if found {
                return Ok(());
            }
            // Definitive no-email answer: fall through to the next rule
        }

        Ok(())
    }

    /// The shared dedup helper: reuse a completed ledger entry, or call the
    /// provider and record the answer on the entry
    async fn reuse_or_call(
        &self,
        provider: Provider,
        mode: SearchMode,
        identity: &Identity,
        need_email: bool,
        need_phone: bool,
        webhook_task: Option<Uuid>,
    ) -> std::result::Result<StepResult, WaterfallError> {
        let (entry, existed) = db::ledger::find_or_create(&self.pool, provider, mode, identity).await?;

        if entry.status == LedgerStatus::Completed {
            debug!(
                provider = provider.as_str(),
                mode = mode.as_str(),
                ledger_id = entry.id,
                "Ledger hit, skipping provider call"
            );
            return Ok(StepResult {
                ledger_id: entry.id,
                emails: entry.emails,
                phones: entry.phones,
                still_searching: false,
            });
        }

        if existed {
            debug!(
                provider = provider.as_str(),
                ledger_id = entry.id,
                "Reusing unresolved ledger entry for retry"
            );
        }

        let webhook_url = webhook_task.map(|task_id| {
            format!(
                "{}/webhook?id={}&taskId={}",
                self.public_base_url, entry.id, task_id
            )
        });

        let opts = FindOpts {
            need_email,
            need_phone,
            mode,
            webhook_url,
        };

        let adapter = self.providers.get(provider);
        match adapter.find(identity, &opts).await {
            Ok(outcome) => {
                if outcome.no_credits {
                    // Entry stays pending; the retry after resume re-calls
                    return Err(WaterfallError::NoCredits);
                }
                if outcome.still_searching {
                    // Entry stays pending until the webhook resolves it
                    return Ok(StepResult {
                        ledger_id: entry.id,
                        emails: Vec::new(),
                        phones: Vec::new(),
                        still_searching: true,
                    });
                }

                db::ledger::mark_completed(&self.pool, entry.id, None, &outcome.emails, &outcome.phones)
                    .await?;
                Ok(StepResult {
                    ledger_id: entry.id,
                    emails: outcome.emails,
                    phones: outcome.phones,
                    still_searching: false,
                })
            }
            Err(e) => {
                db::ledger::mark_failed(&self.pool, entry.id).await?;
                Err(WaterfallError::Transient(e.to_string()))
            }
        }
    }

    /// Asynchronous continuation: a provider's out-of-band completion notice
    ///
    /// Idempotent: a duplicate delivery for an already-finalized task is a
    /// no-op. Finishes the email chain server-side (secondary fallback with
    /// dedup), then finalizes the task: "no email found anywhere" is a
    /// valid Completed state, not an error.
    pub async fn handle_webhook(
        &self,
        ledger_id: i64,
        task_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<WebhookDisposition> {
        let Some(entry) = db::ledger::get_entry(&self.pool, ledger_id).await? else {
            return Err(pf_common::Error::NotFound(format!(
                "Ledger entry not found: {}",
                ledger_id
            )));
        };

        let Some(task) = db::tasks::get_task(&self.pool, task_id).await? else {
            return Err(pf_common::Error::NotFound(format!("Task not found: {}", task_id)));
        };

        if task.status.is_terminal() {
            debug!(task_id = %task_id, ledger_id, "Duplicate webhook for finalized task, ignoring");
            return Ok(WebhookDisposition::Ignored);
        }

        let parsed: WebhookPayload = serde_json::from_value(payload.clone()).unwrap_or(WebhookPayload {
            status: String::new(),
            emails: Vec::new(),
        });

        if parsed.status == "searching" {
            // Provider pinged without a final answer; keep waiting
            return Ok(WebhookDisposition::Ignored);
        }

        // Record the final answer unless an earlier delivery already did
        let emails = if entry.status == LedgerStatus::Completed {
            entry.emails.clone()
        } else {
            db::ledger::mark_completed(&self.pool, ledger_id, Some(&payload), &parsed.emails, &[])
                .await?;
            parsed.emails
        };

        let mut gathered = Gathered::default();
        gathered.absorb(&StepResult {
            ledger_id,
            emails,
            phones: Vec::new(),
            still_searching: false,
        });

        // Searching finished with no email: run the secondary fallback
        // inline, dedup included
        if gathered.emails.is_empty() && task.identity.has_linkedin() {
            match self
                .reuse_or_call(
                    Provider::ProfileEmail,
                    SearchMode::LinkedIn,
                    &task.identity,
                    true,
                    false,
                    None,
                )
                .await
            {
                Ok(step) => gathered.absorb(&step),
                Err(WaterfallError::NoCredits) => {
                    // No queue job exists for this task any more; pause the
                    // batch and park a fresh job for the external resume
                    db::tasks::merge_task_results(
                        &self.pool,
                        task.id,
                        &gathered.emails,
                        &gathered.phones,
                        &gathered.ledger_ids,
                    )
                    .await?;
                    self.pause.pause(task.batch_id).await?;
                    db::queue::enqueue(&self.pool, task.id, task.batch_id).await?;
                    return Ok(WebhookDisposition::Requeued);
                }
                Err(WaterfallError::Transient(msg)) => {
                    // Task is finalized regardless of the fallback's outcome
                    warn!(task_id = %task.id, error = %msg, "Secondary email fallback failed");
                }
                Err(WaterfallError::Db(e)) => return Err(e),
            }
        }

        db::tasks::finalize_task(
            &self.pool,
            task.id,
            TaskStatus::Completed,
            &gathered.emails,
            &gathered.phones,
            &gathered.ledger_ids,
        )
        .await?;
        info!(task_id = %task.id, ledger_id, "Task completed via webhook");

        self.check_and_complete_batch(task.batch_id).await?;
        Ok(WebhookDisposition::Finalized)
    }

    /// Count non-terminal tasks; if none remain, compare-and-set the batch
    /// Completed and dispatch the aggregate callback exactly once, no
    /// matter how many finalizations race here from the worker and webhook
    /// paths.
    pub async fn check_and_complete_batch(&self, batch_id: Uuid) -> Result<()> {
        let remaining = db::tasks::count_non_terminal(&self.pool, batch_id).await?;
        if remaining > 0 {
            return Ok(());
        }

        // Only the CAS winner fires the callback
        if !db::batches::try_complete_batch(&self.pool, batch_id).await? {
            return Ok(());
        }

        info!(batch_id = %batch_id, "Batch completed");

        match db::batches::get_batch(&self.pool, batch_id).await? {
            Some(batch) => self.dispatch_batch_callback(&batch).await,
            None => warn!(batch_id = %batch_id, "Completed batch vanished before callback"),
        }

        Ok(())
    }

    /// Best-effort delivery of the aggregate export to the caller
    async fn dispatch_batch_callback(&self, batch: &Batch) {
        let export = match build_batch_export(&self.pool, batch).await {
            Ok(export) => export,
            Err(e) => {
                warn!(batch_id = %batch.id, error = %e, "Failed to build batch export for callback");
                return;
            }
        };

        let Some(ref url) = batch.callback_url else {
            info!(batch_id = %batch.id, subjects = export.subjects.len(), "Batch callback (no URL configured, logged only)");
            return;
        };

        match self.http_client.post(url).json(&export).send().await {
            Ok(response) if response.status().is_success() => {
                info!(batch_id = %batch.id, "Batch callback delivered");
            }
            Ok(response) => {
                warn!(batch_id = %batch.id, status = %response.status(), "Batch callback rejected");
            }
            Err(e) => {
                warn!(batch_id = %batch.id, error = %e, "Batch callback delivery failed");
            }
        }
    }
}

/// Per-subject aggregation for export and callback delivery
///
/// Tasks sharing a `user_id` merge: email/phone lists concatenate in task
/// order, without deduplication at this layer.
pub async fn build_batch_export(pool: &SqlitePool, batch: &Batch) -> Result<BatchExport> {
    let tasks = db::tasks::list_tasks_for_batch(pool, batch.id).await?;

    let mut subjects: Vec<SubjectContacts> = Vec::new();
    for task in &tasks {
        match subjects.iter_mut().find(|s| s.user_id == task.identity.user_id) {
            Some(subject) => {
                subject.emails.extend(task.emails.iter().cloned());
                subject.phones.extend(task.phones.iter().cloned());
            }
            None => subjects.push(SubjectContacts {
                user_id: task.identity.user_id.clone(),
                user_source: task.identity.user_source.clone(),
                emails: task.emails.clone(),
                phones: task.phones.clone(),
            }),
        }
    }

    Ok(BatchExport {
        batch_id: batch.external_ref.clone(),
        subjects,
    })
}
