//! Pipeline behavior tests: waterfall, dedup, pause backpressure, and the
//! dual completion paths

mod common;

use common::*;
use pf_pipeline::db;
use pf_pipeline::models::{BatchStatus, Identity, SearchMode, Task, TaskStatus};
use pf_pipeline::processor::{JobOutcome, WebhookDisposition};
use pf_pipeline::worker;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

fn domain_identity(user_id: &str) -> Identity {
    Identity::new(user_id, "crm", "Ada Lovelace", Some("acme.com".to_string()), None)
}

fn linkedin_identity(user_id: &str) -> Identity {
    Identity::new(user_id, "crm", "Ada Lovelace", None, Some("ada-lovelace".to_string()))
}

fn full_identity(user_id: &str) -> Identity {
    Identity::new(
        user_id,
        "crm",
        "Ada Lovelace",
        Some("acme.com".to_string()),
        Some("ada-lovelace".to_string()),
    )
}

// ============================================================================
// Dedup and supersession
// ============================================================================

#[tokio::test]
async fn identical_lookups_create_one_ledger_entry() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(with_phones(&["+15550001111"]));

    // Two tasks, same subject, same search inputs
    let t1 = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), false, true).await;
    let t2 = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), false, true).await;

    drain_queue(&pipeline, 10).await;

    // One provider call; the second job reused the first's ledger entry
    assert_eq!(pipeline.data_lake.call_count(), 1);

    for task_id in [t1.id, t2.id] {
        let task = db::tasks::get_task(&pipeline.pool, task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.phones, vec!["+15550001111"]);
        assert_eq!(task.call_ledger_ids.len(), 1);
    }

    let t1 = db::tasks::get_task(&pipeline.pool, t1.id).await.unwrap().unwrap();
    let t2 = db::tasks::get_task(&pipeline.pool, t2.id).await.unwrap().unwrap();
    assert_eq!(t1.call_ledger_ids, t2.call_ledger_ids);
}

#[tokio::test]
async fn linkedin_phone_result_supersedes_domain_search() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(with_phones(&["+15550002222"]));

    // First task searches LinkedIn-mode and finds a phone
    insert_task(&pipeline.pool, batch.id, linkedin_identity("u1"), false, true).await;
    drain_queue(&pipeline, 5).await;
    assert_eq!(pipeline.data_lake.call_count(), 1);

    // Second task, same subject, domain-mode only: the prior precise hit is
    // reused and the provider is never called again
    let t2 = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), false, true).await;
    drain_queue(&pipeline, 5).await;

    assert_eq!(pipeline.data_lake.call_count(), 1);
    let t2 = db::tasks::get_task(&pipeline.pool, t2.id).await.unwrap().unwrap();
    assert_eq!(t2.status, TaskStatus::Completed);
    assert_eq!(t2.phones, vec!["+15550002222"]);
}

#[tokio::test]
async fn email_has_no_supersession_rule() {
    // Documented asymmetry: a LinkedIn-mode email hit does not pre-empt a
    // later domain-mode email search for the same subject.
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    // Subject resolved via profile finder (LinkedIn mode, no domain)
    pipeline.profile_email.script_outcome(with_emails(&["ada@acme.com"]));
    insert_task(&pipeline.pool, batch.id, linkedin_identity("u1"), true, false).await;
    drain_queue(&pipeline, 5).await;
    assert_eq!(pipeline.profile_email.call_count(), 1);

    // Same subject again, now with a domain: the primary provider is still
    // consulted even though a LinkedIn-mode email already exists
    pipeline.domain_email.script_outcome(with_emails(&["ada@corp.acme.com"]));
    insert_task(&pipeline.pool, batch.id, domain_identity("u1"), true, false).await;
    drain_queue(&pipeline, 5).await;

    assert_eq!(pipeline.domain_email.call_count(), 1);
}

// ============================================================================
// Waterfall shape
// ============================================================================

#[tokio::test]
async fn phone_side_effect_email_skips_email_chain() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(pf_pipeline::providers::ProviderOutcome {
        emails: vec!["ada@acme.com".to_string()],
        phones: vec!["+15550003333".to_string()],
        ..Default::default()
    });

    let task = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), true, true).await;
    drain_queue(&pipeline, 5).await;

    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.emails, vec!["ada@acme.com"]);
    assert_eq!(task.phones, vec!["+15550003333"]);

    // Email was satisfied by the phone step's side effect
    assert_eq!(pipeline.domain_email.call_count(), 0);
    assert_eq!(pipeline.profile_email.call_count(), 0);
}

#[tokio::test]
async fn empty_primary_falls_back_to_profile_finder() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.domain_email.script_outcome(with_emails(&[]));
    pipeline.profile_email.script_outcome(with_emails(&["ada@acme.com"]));

    let task = insert_task(&pipeline.pool, batch.id, full_identity("u1"), true, false).await;
    drain_queue(&pipeline, 5).await;

    assert_eq!(pipeline.domain_email.call_count(), 1);
    assert_eq!(pipeline.profile_email.call_count(), 1);

    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.emails, vec!["ada@acme.com"]);
    assert_eq!(task.call_ledger_ids.len(), 2);
}

#[tokio::test]
async fn missing_inputs_skip_capabilities_without_failing() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    // No domain, no LinkedIn handle: both capabilities skip, task completes
    // empty: "no data found" is a valid terminal result
    let identity = Identity::new("u1", "crm", "Ada Lovelace", None, None);
    let task = insert_task(&pipeline.pool, batch.id, identity, true, true).await;
    drain_queue(&pipeline, 5).await;

    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.emails.is_empty());
    assert!(task.phones.is_empty());

    assert_eq!(pipeline.data_lake.call_count(), 0);
    assert_eq!(pipeline.domain_email.call_count(), 0);

    let batch = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
}

// ============================================================================
// Pause backpressure
// ============================================================================

#[tokio::test]
async fn no_credits_pauses_batch_and_requeues_untouched() {
    let pipeline = test_pipeline().await;
    let batch_a = insert_batch(&pipeline.pool).await;
    let batch_b = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(no_credits());
    pipeline.data_lake.script_outcome(with_phones(&["+15550004444"]));

    let task_a = insert_task(&pipeline.pool, batch_a.id, domain_identity("a1"), false, true).await;
    let task_b = insert_task(&pipeline.pool, batch_b.id, domain_identity("b1"), false, true).await;

    // Job A hits credit exhaustion: batch A pauses, job is re-queued
    let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
    assert_eq!(job.task_id, task_a.id);
    let outcome = pipeline.processor.process_job(&job).await.unwrap();
    assert_eq!(outcome, JobOutcome::Requeued);
    assert!(pipeline.pause.is_paused(batch_a.id).await.unwrap());
    assert!(!pipeline.pause.is_paused(batch_b.id).await.unwrap());

    // Batch B's job is now at the head and processes normally
    let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
    assert_eq!(job.task_id, task_b.id);
    pipeline.processor.process_job(&job).await.unwrap();
    let task_b = db::tasks::get_task(&pipeline.pool, task_b.id).await.unwrap().unwrap();
    assert_eq!(task_b.status, TaskStatus::Completed);

    // A's job cycles through the queue untouched while paused: no provider
    // call, attempts unchanged
    let calls_before = pipeline.data_lake.call_count();
    let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
    assert_eq!(job.task_id, task_a.id);
    let outcome = pipeline.processor.process_job(&job).await.unwrap();
    assert_eq!(outcome, JobOutcome::Requeued);
    assert_eq!(pipeline.data_lake.call_count(), calls_before);
    let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
    assert_eq!(job.attempts, 0);

    // External resume lets the parked job run to completion
    pipeline.data_lake.script_outcome(with_phones(&["+15550005555"]));
    pipeline.pause.resume(batch_a.id).await.unwrap();
    drain_queue(&pipeline, 5).await;
    let task_a = db::tasks::get_task(&pipeline.pool, task_a.id).await.unwrap().unwrap();
    assert_eq!(task_a.status, TaskStatus::Completed);
}

// ============================================================================
// Transient failures
// ============================================================================

#[tokio::test]
async fn transient_failures_requeue_then_fail_terminal() {
    let pipeline = test_pipeline_with_max_attempts(3).await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline
        .data_lake
        .script(Scripted::Transport("connection timed out".to_string()));

    let task = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), false, true).await;

    // Two re-queues, then the cap marks the task failed
    for expected_attempts in [0, 1] {
        let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
        assert_eq!(job.attempts, expected_attempts);
        let outcome = pipeline.processor.process_job(&job).await.unwrap();
        assert_eq!(outcome, JobOutcome::Requeued);
    }

    let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
    assert_eq!(job.attempts, 2);
    let outcome = pipeline.processor.process_job(&job).await.unwrap();
    assert_eq!(outcome, JobOutcome::Finalized);

    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);

    // A failed task is terminal: the batch still completes
    let batch = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(db::queue::depth(&pipeline.pool).await.unwrap(), 0);
}

// ============================================================================
// Async provider and webhook continuation
// ============================================================================

#[tokio::test]
async fn still_searching_defers_completion_to_webhook() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.domain_email.script_outcome(searching());

    // Only a company domain: the fallback rule can never apply
    let task = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), true, false).await;

    let job = db::queue::next_job(&pipeline.pool).await.unwrap().unwrap();
    let outcome = pipeline.processor.process_job(&job).await.unwrap();
    assert_eq!(outcome, JobOutcome::AwaitingWebhook);

    // Task parked in Processing; the provider got a parameterized callback
    let parked = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(parked.status, TaskStatus::Processing);
    let urls = pipeline.domain_email.webhook_urls.lock().unwrap().clone();
    let url = urls[0].as_deref().unwrap();
    assert!(url.contains(&format!("taskId={}", task.id)));

    let batch_row = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch_row.status, BatchStatus::Pending);

    // Provider reports "finished, no email"; no LinkedIn handle exists, so
    // the fallback is skipped and the task completes empty
    let ledger_id = parked.call_ledger_ids[0];
    let disposition = pipeline
        .processor
        .handle_webhook(ledger_id, task.id, serde_json::json!({"status": "completed", "emails": []}))
        .await
        .unwrap();
    assert_eq!(disposition, WebhookDisposition::Finalized);

    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.emails.is_empty());
    assert_eq!(pipeline.profile_email.call_count(), 0);

    let batch_row = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch_row.status, BatchStatus::Completed);
}

#[tokio::test]
async fn webhook_runs_secondary_fallback_inline() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.domain_email.script_outcome(searching());
    pipeline.profile_email.script_outcome(with_emails(&["ada@acme.com"]));

    let task = insert_task(&pipeline.pool, batch.id, full_identity("u1"), true, false).await;
    drain_queue(&pipeline, 5).await;

    let parked = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    let ledger_id = parked.call_ledger_ids[0];

    let disposition = pipeline
        .processor
        .handle_webhook(ledger_id, task.id, json!({"status": "completed", "emails": []}))
        .await
        .unwrap();
    assert_eq!(disposition, WebhookDisposition::Finalized);

    assert_eq!(pipeline.profile_email.call_count(), 1);
    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.emails, vec!["ada@acme.com"]);
    assert_eq!(task.call_ledger_ids.len(), 2);
}

#[tokio::test]
async fn duplicate_webhook_delivery_is_a_noop() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.domain_email.script_outcome(searching());
    let task = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), true, false).await;
    drain_queue(&pipeline, 5).await;

    let parked = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    let ledger_id = parked.call_ledger_ids[0];
    let payload = json!({"status": "completed", "emails": ["ada@acme.com"]});

    let first = pipeline
        .processor
        .handle_webhook(ledger_id, task.id, payload.clone())
        .await
        .unwrap();
    assert_eq!(first, WebhookDisposition::Finalized);

    let second = pipeline
        .processor
        .handle_webhook(ledger_id, task.id, payload)
        .await
        .unwrap();
    assert_eq!(second, WebhookDisposition::Ignored);

    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.emails, vec!["ada@acme.com"]);
    assert_eq!(task.call_ledger_ids.len(), 1);
}

#[tokio::test]
async fn webhook_fallback_no_credits_pauses_and_requeues() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.domain_email.script_outcome(searching());
    pipeline.profile_email.script_outcome(no_credits());

    let task = insert_task(&pipeline.pool, batch.id, full_identity("u1"), true, false).await;
    drain_queue(&pipeline, 5).await;
    assert_eq!(db::queue::depth(&pipeline.pool).await.unwrap(), 0);

    let parked = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    let ledger_id = parked.call_ledger_ids[0];

    let disposition = pipeline
        .processor
        .handle_webhook(ledger_id, task.id, json!({"status": "completed", "emails": []}))
        .await
        .unwrap();
    assert_eq!(disposition, WebhookDisposition::Requeued);

    assert!(pipeline.pause.is_paused(batch.id).await.unwrap());
    // The task is parked back on the queue for the external resume
    assert_eq!(db::queue::depth(&pipeline.pool).await.unwrap(), 1);
    let task = db::tasks::get_task(&pipeline.pool, task.id).await.unwrap().unwrap();
    assert!(!task.status.is_terminal());
}

// ============================================================================
// Batch completion
// ============================================================================

#[tokio::test]
async fn batch_callback_fires_exactly_once_under_races() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(with_phones(&["+15550006666"]));
    insert_task(&pipeline.pool, batch.id, domain_identity("u1"), false, true).await;
    drain_queue(&pipeline, 5).await;

    // All tasks terminal: many concurrent completion checks, one CAS winner
    let mut wins = 0;
    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = pipeline.pool.clone();
        let batch_id = batch.id;
        handles.push(tokio::spawn(async move {
            db::batches::try_complete_batch(&pool, batch_id).await.unwrap()
        }));
    }
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }

    // drain_queue already completed the batch, so every late check loses
    assert_eq!(wins, 0);

    let batch = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert!(batch.completed_at.is_some());
}

#[tokio::test]
async fn concurrent_completion_cas_has_single_winner() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = pipeline.pool.clone();
        let batch_id = batch.id;
        handles.push(tokio::spawn(async move {
            db::batches::try_complete_batch(&pool, batch_id).await.unwrap()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn batch_completes_only_when_all_tasks_terminal() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(with_phones(&["+15550007777"]));
    pipeline.domain_email.script_outcome(searching());

    let phone_task = insert_task(&pipeline.pool, batch.id, domain_identity("u1"), false, true).await;
    let email_task = insert_task(&pipeline.pool, batch.id, domain_identity("u2"), true, false).await;

    drain_queue(&pipeline, 5).await;

    // Phone task finished, email task still awaiting its webhook
    let phone_task = db::tasks::get_task(&pipeline.pool, phone_task.id).await.unwrap().unwrap();
    assert_eq!(phone_task.status, TaskStatus::Completed);
    let batch_row = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch_row.status, BatchStatus::Pending);

    // Webhook resolves the straggler; the batch flips
    let email_task = db::tasks::get_task(&pipeline.pool, email_task.id).await.unwrap().unwrap();
    let ledger_id = email_task.call_ledger_ids[0];
    pipeline
        .processor
        .handle_webhook(ledger_id, email_task.id, json!({"status": "completed", "emails": []}))
        .await
        .unwrap();

    let batch_row = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    assert_eq!(batch_row.status, BatchStatus::Completed);
}

// ============================================================================
// Export aggregation
// ============================================================================

#[tokio::test]
async fn export_merges_tasks_sharing_user_id() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(with_phones(&["+15550008888"]));
    pipeline.domain_email.script_outcome(with_emails(&["ada@acme.com"]));

    // Two tasks for the same subject, one per capability
    insert_task(&pipeline.pool, batch.id, linkedin_identity("U1"), false, true).await;
    insert_task(&pipeline.pool, batch.id, domain_identity("U1"), true, false).await;

    drain_queue(&pipeline, 5).await;

    let batch_row = db::batches::get_batch(&pipeline.pool, batch.id).await.unwrap().unwrap();
    let export = pf_pipeline::processor::build_batch_export(&pipeline.pool, &batch_row)
        .await
        .unwrap();

    assert_eq!(export.subjects.len(), 1);
    let subject = &export.subjects[0];
    assert_eq!(subject.user_id, "U1");
    assert_eq!(subject.emails, vec!["ada@acme.com"]);
    assert_eq!(subject.phones, vec!["+15550008888"]);
}

// ============================================================================
// Ledger internals
// ============================================================================

#[tokio::test]
async fn linkedin_mode_entries_blank_the_domain_key() {
    let pipeline = test_pipeline().await;
    let batch = insert_batch(&pipeline.pool).await;

    pipeline.data_lake.script_outcome(with_phones(&["+15550009999"]));

    // Identity with both inputs searches LinkedIn-mode
    insert_task(&pipeline.pool, batch.id, full_identity("u1"), false, true).await;
    drain_queue(&pipeline, 5).await;

    let entry = db::ledger::find_by_key(
        &pipeline.pool,
        pf_pipeline::models::Provider::DataLake,
        SearchMode::LinkedIn,
        &full_identity("u1"),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(entry.company_domain, "");
    assert_eq!(entry.search_mode, SearchMode::LinkedIn);
}

// ============================================================================
// Concurrent writes and worker diagnostics
// ============================================================================

#[tokio::test]
async fn concurrent_result_merges_keep_both_sides() {
    // File-backed multi-connection pool so the two merges really interleave
    let temp = tempfile::tempdir().unwrap();
    let pool = db::init_database_pool(&temp.path().join("pipeline.db"))
        .await
        .unwrap();

    for round in 0..10 {
        let batch = insert_batch(&pool).await;
        let task = Task::new(batch.id, full_identity("u1"), true, true);
        db::tasks::insert_task(&pool, &task).await.unwrap();

        let left = {
            let pool = pool.clone();
            let id = task.id;
            tokio::spawn(async move {
                db::tasks::merge_task_results(&pool, id, &["a@acme.com".to_string()], &[], &[1])
                    .await
            })
        };
        let right = {
            let pool = pool.clone();
            let id = task.id;
            tokio::spawn(async move {
                db::tasks::merge_task_results(&pool, id, &["b@acme.com".to_string()], &[], &[2])
                    .await
            })
        };
        left.await.unwrap().unwrap();
        right.await.unwrap().unwrap();

        let task = db::tasks::get_task(&pool, task.id).await.unwrap().unwrap();
        assert!(
            task.emails.contains(&"a@acme.com".to_string()),
            "round {}: {:?}",
            round,
            task.emails
        );
        assert!(
            task.emails.contains(&"b@acme.com".to_string()),
            "round {}: {:?}",
            round,
            task.emails
        );
        assert_eq!(task.call_ledger_ids.len(), 2, "round {}", round);
    }
}

#[tokio::test]
async fn worker_records_infrastructure_errors() {
    let pipeline = test_pipeline().await;

    // Break the queue so the very first poll fails
    sqlx::query("DROP TABLE job_queue")
        .execute(&pipeline.pool)
        .await
        .unwrap();

    let last_error: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));
    let handle = tokio::spawn(worker::run_worker(
        pipeline.processor.clone(),
        600,
        last_error.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();

    let recorded = last_error.read().await.clone();
    assert!(recorded.unwrap().contains("job queue"));
}
