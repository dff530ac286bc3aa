use std::collections::HashMap;

use models::{ContentHash, Id, PairKey, PairwiseCacheEntry, Verdict};
use sqlx::types::Json as SqlJson;

use crate::{Result, Store};

/// PairLookup is one candidate pair plus both PRs' *current* content
/// hashes, as required to probe the pairwise cache.
#[derive(Debug, Clone)]
pub struct PairLookup {
    pub pair: PairKey,
    pub hash_a: ContentHash,
    pub hash_b: ContentHash,
}

impl Store {
    /// get_pairwise_cache returns verdicts for cache entries whose stored
    /// hashes match the given current hashes exactly. Pairs with no entry,
    /// or whose stored hashes no longer match (because either PR changed),
    /// are silently omitted — the caller treats an absent key as a miss.
    pub async fn get_pairwise_cache(
        &self,
        repo_id: Id,
        pairs: &[PairLookup],
    ) -> Result<HashMap<String, Verdict>> {
        if pairs.is_empty() {
            return Ok(HashMap::new());
        }

        let pr_a: Vec<i64> = pairs.iter().map(|p| p.pair.pr_a_number).collect();
        let pr_b: Vec<i64> = pairs.iter().map(|p| p.pair.pr_b_number).collect();
        let hash_a: Vec<String> = pairs.iter().map(|p| p.hash_a.as_str().to_string()).collect();
        let hash_b: Vec<String> = pairs.iter().map(|p| p.hash_b.as_str().to_string()).collect();

        let rows: Vec<(i64, i64, SqlJson<Verdict>)> = sqlx::query_as(
            r#"
            select c.pr_a_number, c.pr_b_number, c.verdict
            from pairwise_cache c
            join unnest($2::bigint[], $3::bigint[], $4::text[], $5::text[])
                as wanted(pr_a_number, pr_b_number, hash_a, hash_b)
                on c.pr_a_number = wanted.pr_a_number
                and c.pr_b_number = wanted.pr_b_number
                and c.hash_a = wanted.hash_a
                and c.hash_b = wanted.hash_b
            where c.repo_id = $1
            "#,
        )
        .bind(repo_id)
        .bind(&pr_a)
        .bind(&pr_b)
        .bind(&hash_a)
        .bind(&hash_b)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(a, b, verdict)| (PairKey::new(a, b).cache_key(), verdict.0))
            .collect())
    }

    /// set_pairwise_cache atomically inserts or replaces a batch of cache
    /// entries. Always called with both hashes pinned to the PRs' current
    /// content hash at verification time.
    pub async fn set_pairwise_cache(&self, entries: &[PairwiseCacheEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut txn = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                insert into pairwise_cache (repo_id, pr_a_number, pr_b_number, hash_a, hash_b, verdict, updated_at)
                values ($1, $2, $3, $4, $5, $6, now())
                on conflict (repo_id, pr_a_number, pr_b_number) do update set
                    hash_a = excluded.hash_a,
                    hash_b = excluded.hash_b,
                    verdict = excluded.verdict,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(entry.repo_id)
            .bind(entry.pair.pr_a_number)
            .bind(entry.pair.pr_b_number)
            .bind(entry.hash_a.as_str())
            .bind(entry.hash_b.as_str())
            .bind(SqlJson(&entry.verdict))
            .execute(&mut *txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }
}
