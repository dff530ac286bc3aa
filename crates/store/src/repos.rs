use models::{Id, Repo};

use crate::{Result, Store};

impl Store {
    pub async fn get_repo(&self, id: Id) -> Result<Option<Repo>> {
        let row = sqlx::query_as::<_, Repo>(
            r#"
            select id, account_id, owner, name, last_scan_at, created_at
            from repos where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_repo(&self, id: Id, account_id: Id, owner: &str, name: &str) -> Result<Repo> {
        let row = sqlx::query_as::<_, Repo>(
            r#"
            insert into repos (id, account_id, owner, name)
            values ($1, $2, $3, $4)
            returning id, account_id, owner, name, last_scan_at, created_at
            "#,
        )
        .bind(id)
        .bind(account_id)
        .bind(owner)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// set_last_scan_at stamps the repo's incremental-ingest watermark.
    /// Called by the orchestrator once a scan reaches `Done`.
    pub async fn set_last_scan_at(
        &self,
        repo_id: Id,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        sqlx::query("update repos set last_scan_at = $2 where id = $1")
            .bind(repo_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// clear_repos cascades through PRs, scans, jobs, dupe groups, and the
    /// pairwise cache. Used exclusively by operational tooling — never by
    /// the scan pipeline itself.
    pub async fn clear_repos(&self) -> Result<u64> {
        let result = sqlx::query("delete from repos").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
