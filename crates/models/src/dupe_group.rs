use serde::{Deserialize, Serialize};

use crate::{verdict::Relationship, Id};

/// DupeGroupMember is one PR's position within a [`DupeGroup`]: `rank = 1`
/// is the member recommended to keep (typically merge, closing the rest).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct DupeGroupMember {
    pub group_id: Id,
    pub pr_number: i64,
    pub rank: i32,
    pub score: f64,
    pub rationale: String,
}

/// DupeGroup is a set of PRs declared duplicates of one another within a
/// scan. Every pairwise relationship inside the group must be a confirmed
/// positive verdict — see [`crate::verdict::Verdict`] and the clique
/// grouping algorithm that builds these groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct DupeGroup {
    pub id: Id,
    pub scan_id: Id,
    pub label: String,
    pub confidence: f64,
    pub relationship: Relationship,
    #[cfg_attr(feature = "sqlx-support", sqlx(skip))]
    pub members: Vec<DupeGroupMember>,
}

impl DupeGroup {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
