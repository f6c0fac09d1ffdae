//! Shared test fixtures: in-memory pipeline with scripted providers

// Not every test binary exercises every helper
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

use pf_pipeline::db;
use pf_pipeline::models::{Batch, Identity, Provider, Task};
use pf_pipeline::pause::PauseRegistry;
use pf_pipeline::processor::BatchProcessor;
use pf_pipeline::providers::{
    FindOpts, ProviderAdapter, ProviderError, ProviderOutcome, ProviderSet,
};
use sqlx::SqlitePool;

/// One scripted provider answer
#[derive(Debug, Clone)]
pub enum Scripted {
    Outcome(ProviderOutcome),
    Transport(String),
}

/// Provider double: pops scripted answers in order, then repeats the last
/// one (or a definitive no-match when nothing was scripted).
pub struct MockProvider {
    provider: Provider,
    responses: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    pub calls: AtomicUsize,
    pub webhook_urls: Mutex<Vec<Option<String>>>,
}

impl MockProvider {
    pub fn new(provider: Provider) -> Arc<Self> {
        Arc::new(Self {
            provider,
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            webhook_urls: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, response: Scripted) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn script_outcome(&self, outcome: ProviderOutcome) {
        self.script(Scripted::Outcome(outcome));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn find(
        &self,
        _identity: &Identity,
        opts: &FindOpts,
    ) -> Result<ProviderOutcome, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.webhook_urls
            .lock()
            .unwrap()
            .push(opts.webhook_url.clone());

        let next = {
            let mut responses = self.responses.lock().unwrap();
            match responses.pop_front() {
                Some(response) => {
                    *self.last.lock().unwrap() = Some(response.clone());
                    response
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or(Scripted::Outcome(ProviderOutcome::no_match())),
            }
        };

        match next {
            Scripted::Outcome(outcome) => Ok(outcome),
            Scripted::Transport(msg) => Err(ProviderError::Transport(msg)),
        }
    }
}

/// A fully wired in-memory pipeline for tests
pub struct TestPipeline {
    pub pool: SqlitePool,
    pub processor: Arc<BatchProcessor>,
    pub pause: PauseRegistry,
    pub data_lake: Arc<MockProvider>,
    pub domain_email: Arc<MockProvider>,
    pub profile_email: Arc<MockProvider>,
}

pub async fn test_pipeline() -> TestPipeline {
    test_pipeline_with_max_attempts(5).await
}

pub async fn test_pipeline_with_max_attempts(max_attempts: u32) -> TestPipeline {
    let pool = db::init_memory_pool().await.unwrap();
    let pause = PauseRegistry::new(pool.clone());

    let data_lake = MockProvider::new(Provider::DataLake);
    let domain_email = MockProvider::new(Provider::DomainEmail);
    let profile_email = MockProvider::new(Provider::ProfileEmail);

    let providers = ProviderSet {
        data_lake: data_lake.clone() as Arc<dyn ProviderAdapter>,
        domain_email: domain_email.clone() as Arc<dyn ProviderAdapter>,
        profile_email: profile_email.clone() as Arc<dyn ProviderAdapter>,
    };

    let processor = Arc::new(BatchProcessor::new(
        pool.clone(),
        providers,
        pause.clone(),
        "http://127.0.0.1:5810".to_string(),
        max_attempts,
    ));

    TestPipeline {
        pool,
        processor,
        pause,
        data_lake,
        domain_email,
        profile_email,
    }
}

/// Insert a batch with no callback URL
pub async fn insert_batch(pool: &SqlitePool) -> Batch {
    let batch = Batch::new(format!("ext-{}", Uuid::new_v4()), None);
    db::batches::insert_batch(pool, &batch).await.unwrap();
    batch
}

/// Insert a task and enqueue its job
pub async fn insert_task(
    pool: &SqlitePool,
    batch_id: Uuid,
    identity: Identity,
    want_email: bool,
    want_phone: bool,
) -> Task {
    let task = Task::new(batch_id, identity, want_email, want_phone);
    db::tasks::insert_task(pool, &task).await.unwrap();
    db::queue::enqueue(pool, task.id, batch_id).await.unwrap();
    task
}

/// Process queue jobs until it drains or `limit` jobs ran
pub async fn drain_queue(pipeline: &TestPipeline, limit: usize) -> usize {
    let mut processed = 0;
    while processed < limit {
        let Some(job) = db::queue::next_job(&pipeline.pool).await.unwrap() else {
            break;
        };
        pipeline.processor.process_job(&job).await.unwrap();
        processed += 1;
    }
    processed
}

/// Outcome helpers
pub fn with_phones(phones: &[&str]) -> ProviderOutcome {
    ProviderOutcome {
        phones: phones.iter().map(|p| p.to_string()).collect(),
        ..ProviderOutcome::default()
    }
}

pub fn with_emails(emails: &[&str]) -> ProviderOutcome {
    ProviderOutcome {
        emails: emails.iter().map(|e| e.to_string()).collect(),
        ..ProviderOutcome::default()
    }
}

pub fn no_credits() -> ProviderOutcome {
    ProviderOutcome {
        no_credits: true,
        ..ProviderOutcome::default()
    }
}

pub fn searching() -> ProviderOutcome {
    ProviderOutcome {
        still_searching: true,
        ..ProviderOutcome::default()
    }
}
