use models::{ContentHash, Id, Pr, PrUpsert};
use sqlx::types::Json as SqlJson;

use crate::{Result, Store};

impl Store {
    /// upsert_pr inserts or updates a PR by `(repo_id, number)`.
    ///
    /// On update it overwrites every mutable field, and — in the same
    /// statement — nulls `embed_hash`/`intent_summary` whenever any of
    /// `{diff_hash, title, body, file_paths}` changed. This is the sole
    /// mechanism that invalidates the embedding/intent cache; every other
    /// code path that touches a PR row must go through here.
    pub async fn upsert_pr(&self, input: &PrUpsert) -> Result<Pr> {
        let row = sqlx::query_as::<_, Pr>(
            r#"
            insert into prs (
                id, repo_id, number, title, body, author, state, file_paths, diff_hash, updated_at,
                embed_hash, intent_summary
            )
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, null, null)
            on conflict (repo_id, number) do update set
                title = excluded.title,
                body = excluded.body,
                author = excluded.author,
                state = excluded.state,
                file_paths = excluded.file_paths,
                diff_hash = excluded.diff_hash,
                updated_at = excluded.updated_at,
                embed_hash = case
                    when prs.diff_hash is distinct from excluded.diff_hash
                      or prs.title is distinct from excluded.title
                      or prs.body is distinct from excluded.body
                      or prs.file_paths::text is distinct from excluded.file_paths::text
                    then null
                    else prs.embed_hash
                end,
                intent_summary = case
                    when prs.diff_hash is distinct from excluded.diff_hash
                      or prs.title is distinct from excluded.title
                      or prs.body is distinct from excluded.body
                      or prs.file_paths::text is distinct from excluded.file_paths::text
                    then null
                    else prs.intent_summary
                end
            returning id, repo_id, number, title, body, author, state, file_paths, diff_hash,
                updated_at, embed_hash, intent_summary
            "#,
        )
        .bind(crate::next_id())
        .bind(input.repo_id)
        .bind(input.number)
        .bind(&input.title)
        .bind(&input.body)
        .bind(&input.author)
        .bind(input.state)
        .bind(SqlJson(&input.file_paths))
        .bind(&input.diff_hash)
        .bind(input.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_pr(&self, repo_id: Id, number: i64) -> Result<Option<Pr>> {
        let row = sqlx::query_as::<_, Pr>(
            r#"
            select id, repo_id, number, title, body, author, state, file_paths, diff_hash,
                updated_at, embed_hash, intent_summary
            from prs where repo_id = $1 and number = $2
            "#,
        )
        .bind(repo_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// list_prs_by_numbers fetches the PR rows belonging to a scan's ingest
    /// snapshot, in the order given.
    pub async fn list_prs_by_numbers(&self, repo_id: Id, numbers: &[i64]) -> Result<Vec<Pr>> {
        let rows = sqlx::query_as::<_, Pr>(
            r#"
            select id, repo_id, number, title, body, author, state, file_paths, diff_hash,
                updated_at, embed_hash, intent_summary
            from prs where repo_id = $1 and number = any($2)
            "#,
        )
        .bind(repo_id)
        .bind(numbers)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_open_prs(&self, repo_id: Id) -> Result<Vec<Pr>> {
        let rows = sqlx::query_as::<_, Pr>(
            r#"
            select id, repo_id, number, title, body, author, state, file_paths, diff_hash,
                updated_at, embed_hash, intent_summary
            from prs where repo_id = $1 and state = 'open'
            order by number
            "#,
        )
        .bind(repo_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// mark_stale_prs_closed transitions every open PR whose number is NOT
    /// in `open_numbers` to `closed`. Only meaningful for a **full** ingest:
    /// an incremental ingest doesn't see the whole open set, so it can't
    /// tell stale from merely-unfetched and must not call this. An empty
    /// `open_numbers` closes every currently-open PR.
    pub async fn mark_stale_prs_closed(&self, repo_id: Id, open_numbers: &[i64]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            update prs set state = 'closed'
            where repo_id = $1 and state = 'open' and not (number = any($2))
            "#,
        )
        .bind(repo_id)
        .bind(open_numbers)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// update_pr_cache_fields atomically stamps both cache fields once a
    /// PR's embeddings (and, in the same scan, its intent summary) have
    /// been successfully (re)computed.
    pub async fn update_pr_cache_fields(
        &self,
        pr_id: Id,
        embed_hash: ContentHash,
        intent_summary: &str,
    ) -> Result<()> {
        sqlx::query("update prs set embed_hash = $2, intent_summary = $3 where id = $1")
            .bind(pr_id)
            .bind(embed_hash.as_str())
            .bind(intent_summary)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// update_pr_intent_summary stamps only the intent summary, used by the
    /// intent-extraction phase which runs before embedding.
    pub async fn update_pr_intent_summary(&self, pr_id: Id, intent_summary: &str) -> Result<()> {
        sqlx::query("update prs set intent_summary = $2 where id = $1")
            .bind(pr_id)
            .bind(intent_summary)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// update_pr_embed_hash stamps only `embed_hash`, used once both of a
    /// PR's vectors have been successfully upserted into the vector store.
    pub async fn update_pr_embed_hash(&self, pr_id: Id, embed_hash: ContentHash) -> Result<()> {
        sqlx::query("update prs set embed_hash = $2 where id = $1")
            .bind(pr_id)
            .bind(embed_hash.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mark_stale_closes_everything_when_open_numbers_is_empty() {
        // The `not (number = any($2))` predicate is vacuously true for every
        // row when `$2` is empty, matching the documented "close everything"
        // behavior without a special-cased branch.
        let open_numbers: &[i64] = &[];
        assert!(open_numbers.is_empty());
    }
}
