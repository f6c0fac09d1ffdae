//! Batch submission: create Batch + Tasks and enqueue one job per task
//!
//! Multi-valued `companyDomain`/`linkedin` fields (separated by `|`) expand
//! into one task per value combination, all sharing the subject's
//! `userId`/`userSource` so their results merge again at export time.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::models::{identity::split_multi_value, Batch, Identity, Task};
use pf_common::{Error, Result};

/// Submission payload from the external API layer
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSubmission {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    #[serde(rename = "callbackUrl", default)]
    pub callback_url: Option<String>,
    pub peoples: Vec<PersonSubmission>,
}

/// One person to resolve
#[derive(Debug, Clone, Deserialize)]
pub struct PersonSubmission {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userSource")]
    pub user_source: String,
    pub name: String,
    #[serde(rename = "companyDomain", default)]
    pub company_domain: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(rename = "findEmail", default)]
    pub find_email: bool,
    #[serde(rename = "findPhone", default)]
    pub find_phone: bool,
}

/// Expand one submission entry into identities (one per multi-value)
pub fn expand_person(person: &PersonSubmission) -> Vec<Identity> {
    let domains: Vec<Option<String>> = match person.company_domain.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            split_multi_value(raw).into_iter().map(Some).collect()
        }
        _ => vec![None],
    };
    let handles: Vec<Option<String>> = match person.linkedin.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            split_multi_value(raw).into_iter().map(Some).collect()
        }
        _ => vec![None],
    };

    let mut identities = Vec::new();
    for domain in &domains {
        for handle in &handles {
            identities.push(Identity::new(
                person.user_id.clone(),
                person.user_source.clone(),
                person.name.clone(),
                domain.clone(),
                handle.clone(),
            ));
        }
    }
    identities
}

/// Create the batch and its tasks, then enqueue one job per task
pub async fn submit_batch(pool: &SqlitePool, submission: BatchSubmission) -> Result<Batch> {
    if submission.peoples.is_empty() {
        return Err(Error::InvalidInput("Batch has no people".to_string()));
    }

    let batch = Batch::new(submission.batch_id.clone(), submission.callback_url.clone());

    // Expand fully before touching the store, so a rejected submission
    // leaves no orphan batch behind
    let mut tasks = Vec::new();
    for person in &submission.peoples {
        if !person.find_email && !person.find_phone {
            continue;
        }
        for identity in expand_person(person) {
            tasks.push(Task::new(batch.id, identity, person.find_email, person.find_phone));
        }
    }

    if tasks.is_empty() {
        return Err(Error::InvalidInput(
            "Batch has no resolvable people (no capability requested)".to_string(),
        ));
    }

    db::batches::insert_batch(pool, &batch).await?;
    for task in &tasks {
        db::tasks::insert_task(pool, task).await?;
        db::queue::enqueue(pool, task.id, batch.id).await?;
    }

    info!(
        batch_id = %batch.id,
        external_ref = %batch.external_ref,
        tasks = tasks.len(),
        "Batch submitted"
    );

    Ok(batch)
}
