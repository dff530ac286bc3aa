use serde::{Deserialize, Serialize};

use crate::{ContentHash, Id};

/// PrState mirrors the code host's lifecycle for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx-support", sqlx(type_name = "pr_state", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

/// Pr is a pull request snapshot as last observed by ingest.
///
/// `embed_hash` and `intent_summary` are the two cache fields: whenever
/// `embed_hash` equals the PR's current [`ContentHash`], the previously
/// computed embeddings, candidate neighbors, and intent summary are reused
/// verbatim instead of recomputed. Any upsert that changes `diff_hash`,
/// `title`, `body`, or `file_paths` MUST null both fields in the same
/// transaction — that invalidation is the only thing that forces
/// recomputation, so skipping it silently corrupts the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Pr {
    pub id: Id,
    pub repo_id: Id,
    pub number: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub state: PrState,
    #[cfg_attr(feature = "sqlx-support", sqlx(json))]
    pub file_paths: Vec<String>,
    pub diff_hash: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub embed_hash: Option<ContentHash>,
    pub intent_summary: Option<String>,
}

impl Pr {
    /// content_hash is the hash this PR's cache fields must match for a
    /// cache hit. It does not itself read or write `embed_hash`.
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::compute(
            self.diff_hash.as_deref(),
            &self.title,
            &self.body,
            &self.file_paths,
        )
    }

    /// is_cache_fresh is true when this PR's embeddings and intent summary
    /// can be reused as-is for the current content.
    pub fn is_cache_fresh(&self) -> bool {
        self.embed_hash == Some(self.content_hash())
    }
}

/// PrUpsert is the input to `Store::upsert_pr`: everything ingest observed
/// about a PR from the code host. It deliberately excludes `embed_hash` and
/// `intent_summary` — those are owned exclusively by the cache-invalidation
/// logic inside the store, never passed in from outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrUpsert {
    pub repo_id: Id,
    pub number: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub state: PrState,
    pub file_paths: Vec<String>,
    pub diff_hash: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Pr {
        Pr {
            id: Id::new(1),
            repo_id: Id::new(1),
            number: 1,
            title: "Fix login timeout".into(),
            body: "body".into(),
            author: "alice".into(),
            state: PrState::Open,
            file_paths: vec!["src/auth.rs".into()],
            diff_hash: Some("abc123".into()),
            updated_at: chrono::Utc::now(),
            embed_hash: None,
            intent_summary: None,
        }
    }

    #[test]
    fn test_cache_is_stale_without_embed_hash() {
        assert!(!sample().is_cache_fresh());
    }

    #[test]
    fn test_cache_is_fresh_when_hash_matches() {
        let mut pr = sample();
        pr.embed_hash = Some(pr.content_hash());
        assert!(pr.is_cache_fresh());
    }

    #[test]
    fn test_cache_is_stale_after_title_changes() {
        let mut pr = sample();
        pr.embed_hash = Some(pr.content_hash());
        pr.title = "Fix login bug".into();
        assert!(!pr.is_cache_fresh());
    }
}
