//! Call ledger persistence: audit trail and dedup index in one table
//!
//! Creation goes through `find_or_create`, which is atomic on the dedup key
//! (`INSERT ... ON CONFLICT DO NOTHING` + select), so the worker and the
//! webhook path can race without ever creating a duplicate entry.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::{CallLedgerEntry, Identity, LedgerStatus, Provider, SearchMode};
use pf_common::{Error, Result};

/// Normalized dedup-key domain for a (mode, identity) pair
///
/// LinkedIn-mode entries blank the domain so a LinkedIn-mode result can be
/// found by a later domain-mode lookup for the same subject.
pub fn dedup_domain(mode: SearchMode, identity: &Identity) -> String {
    match mode {
        SearchMode::LinkedIn => String::new(),
        SearchMode::Domain => identity.company_domain.clone().unwrap_or_default(),
    }
}

/// Look up the entry for a (provider, mode, identity) dedup triple
pub async fn find_by_key(
    pool: &SqlitePool,
    provider: Provider,
    mode: SearchMode,
    identity: &Identity,
) -> Result<Option<CallLedgerEntry>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM call_ledger
        WHERE provider = ? AND search_mode = ? AND user_id = ? AND user_source = ? AND company_domain = ?
        "#,
    )
    .bind(provider.as_str())
    .bind(mode.as_str())
    .bind(&identity.user_id)
    .bind(&identity.user_source)
    .bind(dedup_domain(mode, identity))
    .fetch_optional(pool)
    .await?;

    row.map(parse_ledger_row).transpose()
}

/// Find a completed LinkedIn-mode entry for this subject with phones
///
/// Supersession check: a precise LinkedIn-mode hit pre-empts a broader
/// domain-mode retry for the same subject.
pub async fn find_linkedin_phone_hit(
    pool: &SqlitePool,
    provider: Provider,
    identity: &Identity,
) -> Result<Option<CallLedgerEntry>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM call_ledger
        WHERE provider = ? AND search_mode = 'linkedin'
          AND user_id = ? AND user_source = ?
          AND status = 'completed' AND phones != '[]'
        "#,
    )
    .bind(provider.as_str())
    .bind(&identity.user_id)
    .bind(&identity.user_source)
    .fetch_optional(pool)
    .await?;

    row.map(parse_ledger_row).transpose()
}

/// Return the entry for the dedup triple, creating a pending one if absent
///
/// The boolean is true when an entry already existed.
pub async fn find_or_create(
    pool: &SqlitePool,
    provider: Provider,
    mode: SearchMode,
    identity: &Identity,
) -> Result<(CallLedgerEntry, bool)> {
    if let Some(entry) = find_by_key(pool, provider, mode, identity).await? {
        return Ok((entry, true));
    }

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO call_ledger
            (provider, search_mode, user_id, user_source, name, company_domain, linkedin_handle,
             status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        ON CONFLICT(provider, search_mode, user_id, user_source, company_domain) DO NOTHING
        "#,
    )
    .bind(provider.as_str())
    .bind(mode.as_str())
    .bind(&identity.user_id)
    .bind(&identity.user_source)
    .bind(&identity.name)
    .bind(dedup_domain(mode, identity))
    .bind(identity.linkedin_handle.clone().unwrap_or_default())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    // Re-select: either our insert or a concurrent winner's row
    let entry = find_by_key(pool, provider, mode, identity)
        .await?
        .ok_or_else(|| Error::Internal("Ledger entry vanished after insert".to_string()))?;

    Ok((entry, false))
}

/// Load an entry by id
pub async fn get_entry(pool: &SqlitePool, id: i64) -> Result<Option<CallLedgerEntry>> {
    let row = sqlx::query("SELECT * FROM call_ledger WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(parse_ledger_row).transpose()
}

/// Record a final provider answer on a pending entry
pub async fn mark_completed(
    pool: &SqlitePool,
    id: i64,
    payload: Option<&serde_json::Value>,
    emails: &[String],
    phones: &[String],
) -> Result<()> {
    sqlx::query(
        "UPDATE call_ledger SET status = 'completed', result_payload = ?, emails = ?, phones = ?, updated_at = ? WHERE id = ?",
    )
    .bind(payload.map(|p| p.to_string()))
    .bind(to_json(emails)?)
    .bind(to_json(phones)?)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a transport failure; the row stays reusable for the next attempt
pub async fn mark_failed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE call_ledger SET status = 'failed', updated_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("Serialization failed: {}", e)))
}

fn parse_ledger_row(row: sqlx::sqlite::SqliteRow) -> Result<CallLedgerEntry> {
    let provider: String = row.get("provider");
    let provider = Provider::parse(&provider)
        .ok_or_else(|| Error::Internal(format!("Unknown provider: {}", provider)))?;

    let search_mode: String = row.get("search_mode");
    let search_mode = SearchMode::parse(&search_mode)
        .ok_or_else(|| Error::Internal(format!("Unknown search mode: {}", search_mode)))?;

    let status: String = row.get("status");
    let status = LedgerStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown ledger status: {}", status)))?;

    let result_payload: Option<String> = row.get("result_payload");
    let result_payload = result_payload
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse result payload: {}", e)))?;

    let emails: String = row.get("emails");
    let phones: String = row.get("phones");

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(CallLedgerEntry {
        id: row.get("id"),
        provider,
        search_mode,
        user_id: row.get("user_id"),
        user_source: row.get("user_source"),
        name: row.get("name"),
        company_domain: row.get("company_domain"),
        linkedin_handle: row.get("linkedin_handle"),
        status,
        result_payload,
        emails: serde_json::from_str(&emails)
            .map_err(|e| Error::Internal(format!("Failed to parse emails: {}", e)))?,
        phones: serde_json::from_str(&phones)
            .map_err(|e| Error::Internal(format!("Failed to parse phones: {}", e)))?,
        created_at,
        updated_at,
    })
}
