use serde::{Deserialize, Serialize};

use crate::{ContentHash, Verdict};

/// PairKey identifies an unordered PR pair within a repo, always stored
/// with the smaller number first so `(A, B)` and `(B, A)` collide on the
/// same cache row instead of duplicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub pr_a_number: i64,
    pub pr_b_number: i64,
}

impl PairKey {
    pub fn new(a: i64, b: i64) -> Self {
        if a < b {
            Self {
                pr_a_number: a,
                pr_b_number: b,
            }
        } else {
            Self {
                pr_a_number: b,
                pr_b_number: a,
            }
        }
    }

    /// cache_key is the string form used as a map key when the store
    /// returns a batch of cache lookups, e.g. `"1-2"`.
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.pr_a_number, self.pr_b_number)
    }
}

/// PairwiseCacheEntry is `(repo, A, B, hashA, hashB) -> verdict`. A cache
/// hit requires both hashes to match the *current* `embed_hash` of both
/// PRs exactly: mutating either PR's content invalidates the entry, even
/// though the row itself isn't deleted until the repo cascades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseCacheEntry {
    pub repo_id: crate::Id,
    pub pair: PairKey,
    pub hash_a: ContentHash,
    pub hash_b: ContentHash,
    pub verdict: Verdict,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(PairKey::new(2, 1), PairKey::new(1, 2));
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(PairKey::new(5, 2).cache_key(), "2-5");
    }
}
