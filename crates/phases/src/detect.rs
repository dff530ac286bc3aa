//! §4.6 Candidate Search: prunes the O(N²) PR-pair space down to a small
//! candidate set using nearest-neighbor search over the intent and code
//! vector collections.

use std::collections::BTreeSet;

use models::{Id, Pr};
use providers::{point_id, SearchFilter, VectorStore};

use crate::embed::{CODE_COLLECTION, INTENT_COLLECTION};
use crate::error::Result;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_INTENT_THRESHOLD: f32 = 0.65;
pub const DEFAULT_CODE_THRESHOLD: f32 = 0.85;

pub struct CandidateSearchInput {
    pub top_k: usize,
    pub intent_threshold: f32,
    pub code_threshold: f32,
}

impl Default for CandidateSearchInput {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            intent_threshold: DEFAULT_INTENT_THRESHOLD,
            code_threshold: DEFAULT_CODE_THRESHOLD,
        }
    }
}

/// CandidatePair is an unordered PR pair with `a < b`, enforced by
/// [`ordered_pair`] at every construction site so later stages never have to
/// re-normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidatePair {
    pub a: i64,
    pub b: i64,
}

pub fn ordered_pair(x: i64, y: i64) -> CandidatePair {
    if x < y {
        CandidatePair { a: x, b: y }
    } else {
        CandidatePair { a: y, b: x }
    }
}

/// run searches both collections for each PR's nearest neighbors and unions
/// the resulting pairs. Candidates are deduplicated; a pair surfaced by both
/// collections appears once.
pub async fn run(vector_store: &dyn VectorStore, repo_id: Id, prs: &[Pr], input: CandidateSearchInput) -> Result<BTreeSet<CandidatePair>> {
    let mut candidates = BTreeSet::new();

    for pr in prs {
        search_collection(
            vector_store,
            repo_id,
            pr,
            INTENT_COLLECTION,
            input.top_k,
            input.intent_threshold,
            &mut candidates,
        )
        .await?;
        search_collection(
            vector_store,
            repo_id,
            pr,
            CODE_COLLECTION,
            input.top_k,
            input.code_threshold,
            &mut candidates,
        )
        .await?;
    }

    Ok(candidates)
}

async fn search_collection(
    vector_store: &dyn VectorStore,
    repo_id: Id,
    pr: &Pr,
    collection: &str,
    top_k: usize,
    threshold: f32,
    candidates: &mut BTreeSet<CandidatePair>,
) -> Result<()> {
    let signal = if collection == CODE_COLLECTION { "code" } else { "intent" };
    let own_id = point_id(repo_id, pr.number, signal);
    let Some(vector) = vector_store.get_vector(collection, &own_id).await? else {
        return Ok(());
    };

    let filter = SearchFilter {
        must_equal: std::collections::HashMap::from([("repo_id".to_string(), serde_json::json!(repo_id))]),
    };
    // Request one extra hit since a PR's own vector is always its closest neighbor.
    let hits = vector_store.search(collection, &vector, top_k + 1, &filter).await?;

    for hit in hits {
        if hit.id == own_id || hit.score < threshold {
            continue;
        }
        let Some(other_number) = pr_number_from_payload(&hit.payload) else {
            continue;
        };
        if other_number == pr.number {
            continue;
        }
        candidates.insert(ordered_pair(pr.number, other_number));
    }

    Ok(())
}

fn pr_number_from_payload(payload: &std::collections::HashMap<String, serde_json::Value>) -> Option<i64> {
    payload.get("pr_number").and_then(|v| v.as_i64())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ordered_pair_is_always_ascending() {
        assert_eq!(ordered_pair(5, 2), CandidatePair { a: 2, b: 5 });
        assert_eq!(ordered_pair(2, 5), CandidatePair { a: 2, b: 5 });
    }

    #[test]
    fn test_candidate_pair_dedupes_in_a_set() {
        let mut set = BTreeSet::new();
        set.insert(ordered_pair(1, 2));
        set.insert(ordered_pair(2, 1));
        assert_eq!(set.len(), 1);
    }
}
