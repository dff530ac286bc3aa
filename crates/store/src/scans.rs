use models::{Id, PhaseCursor, Scan, ScanStatus, TokenUsage};
use sqlx::types::Json as SqlJson;
use std::collections::BTreeMap;

use crate::{Result, Store};

/// ScanStatusUpdate is a partial update to a scan row: only the fields set
/// to `Some` are written, matching the contract in §4.1 — callers don't
/// need to re-supply the whole row just to flip `status`.
#[derive(Debug, Default)]
pub struct ScanStatusUpdate {
    pub error: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub phase_cursor: Option<PhaseCursor>,
    pub pr_count: Option<i64>,
    pub dupe_group_count: Option<i64>,
}

const SCAN_COLUMNS: &str = r#"
    id, repo_id, account_id, status, full_scan as "full", phase_cursor, token_usage,
    provider_identities, pr_count, dupe_group_count, error, created_at, completed_at
"#;

impl Store {
    /// create_scan creates a new scan in `Queued` status, unless a
    /// non-terminal scan already exists for this `(repo_id, account_id)` —
    /// in which case the existing scan's id is returned instead, per the
    /// orchestrator's "one active scan per repo+account" invariant.
    pub async fn create_scan(&self, repo_id: Id, account_id: Id, full: bool) -> Result<Scan> {
        let inserted = sqlx::query_as::<_, Scan>(&format!(
            r#"
            insert into scans (id, repo_id, account_id, status, full_scan)
            values ($1, $2, $3, 'queued', $4)
            on conflict (repo_id, account_id) where status not in ('done', 'failed') do nothing
            returning {SCAN_COLUMNS}
            "#
        ))
        .bind(crate::next_id())
        .bind(repo_id)
        .bind(account_id)
        .bind(full)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(scan) = inserted {
            return Ok(scan);
        }

        self.active_scan(repo_id, account_id)
            .await?
            .ok_or_else(|| {
                crate::Error::Invariant(format!(
                    "create_scan conflicted but no active scan found for repo {repo_id:?}"
                ))
            })
    }

    pub async fn active_scan(&self, repo_id: Id, account_id: Id) -> Result<Option<Scan>> {
        let row = sqlx::query_as::<_, Scan>(&format!(
            r#"
            select {SCAN_COLUMNS} from scans
            where repo_id = $1 and account_id = $2 and status not in ('done', 'failed')
            "#
        ))
        .bind(repo_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_scan(&self, id: Id) -> Result<Option<Scan>> {
        let row = sqlx::query_as::<_, Scan>(&format!("select {SCAN_COLUMNS} from scans where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn set_scan_status(&self, id: Id, status: ScanStatus, update: ScanStatusUpdate) -> Result<()> {
        sqlx::query(
            r#"
            update scans set
                status = $2,
                error = coalesce($3, error),
                completed_at = coalesce($4, completed_at),
                phase_cursor = coalesce($5, phase_cursor),
                pr_count = coalesce($6, pr_count),
                dupe_group_count = coalesce($7, dupe_group_count)
            where id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(update.error)
        .bind(update.completed_at)
        .bind(update.phase_cursor.map(SqlJson))
        .bind(update.pr_count)
        .bind(update.dupe_group_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// clear_scan_cursor nulls `phase_cursor`, used when a phase fails so
    /// the next attempt doesn't try to resume a batch that's no longer
    /// relevant.
    pub async fn clear_scan_cursor(&self, id: Id) -> Result<()> {
        sqlx::query("update scans set phase_cursor = '{}' where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// add_token_usage merges `delta` into the scan's token usage map,
    /// summing any keys that already exist (e.g. repeated `intent.input`
    /// increments across batches).
    pub async fn add_token_usage(&self, id: Id, delta: &TokenUsage) -> Result<()> {
        let mut txn = self.pool.begin().await?;
        let existing: SqlJson<TokenUsage> =
            sqlx::query_scalar("select token_usage from scans where id = $1 for update")
                .bind(id)
                .fetch_one(&mut *txn)
                .await?;

        let mut merged: TokenUsage = existing.0;
        for (k, v) in delta {
            *merged.entry(k.clone()).or_insert(0) += v;
        }

        sqlx::query("update scans set token_usage = $2 where id = $1")
            .bind(id)
            .bind(SqlJson(&merged))
            .execute(&mut *txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn set_provider_identity(&self, id: Id, role: &str, identity: &str) -> Result<()> {
        let mut txn = self.pool.begin().await?;
        let existing: SqlJson<BTreeMap<String, String>> =
            sqlx::query_scalar("select provider_identities from scans where id = $1 for update")
                .bind(id)
                .fetch_one(&mut *txn)
                .await?;
        let mut merged = existing.0;
        merged.insert(role.to_string(), identity.to_string());

        sqlx::query("update scans set provider_identities = $2 where id = $1")
            .bind(id)
            .bind(SqlJson(&merged))
            .execute(&mut *txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    /// clear_scans truncates all scans, additionally nulling PR cache
    /// fields and clearing the pairwise cache, per the contract in §4.1.
    /// Operational tooling only.
    pub async fn clear_scans(&self) -> Result<()> {
        let mut txn = self.pool.begin().await?;
        sqlx::query("delete from scans").execute(&mut *txn).await?;
        sqlx::query("update prs set embed_hash = null, intent_summary = null")
            .execute(&mut *txn)
            .await?;
        sqlx::query("delete from pairwise_cache").execute(&mut *txn).await?;
        txn.commit().await?;
        Ok(())
    }
}
